use dashmap::DashMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::clock::Clock;
use crate::models::SummaryType;

// Cache entry with timestamp
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub summary: String,
    pub created_at: Instant,
}

// Create a cache key (hash of summary type + text). The type name never
// contains a NUL, so the separator keeps every (text, type) pair distinct.
pub fn make_cache_key(text: &str, summary_type: SummaryType) -> String {
    let mut hasher = Sha256::new();
    hasher.update(summary_type.as_str());
    hasher.update([0u8]);
    hasher.update(text);
    format!("{:x}", hasher.finalize())
}

/// In-memory summary cache with a fixed TTL and an upper bound on entries.
///
/// Expiry is lazy: a stale entry is only noticed (and dropped) when it is
/// read, or when a store needs room.
pub struct SummaryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    // serializes stores so the capacity check and the insert act as one step
    write_lock: Mutex<()>,
}

impl SummaryCache {
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn lookup(&self, text: &str, summary_type: SummaryType) -> Option<String> {
        let key = make_cache_key(text, summary_type);
        let now = self.clock.now();

        let expired = match self.entries.get(&key) {
            Some(entry) if now.duration_since(entry.created_at) < self.ttl => {
                return Some(entry.summary.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // re-check under the shard lock, a fresh store may have raced us
            self.entries
                .remove_if(&key, |_, e| now.duration_since(e.created_at) >= self.ttl);
            debug!(key = %key, "cache entry expired");
        }
        None
    }

    pub fn store(&self, text: &str, summary_type: SummaryType, summary: String) {
        let key = make_cache_key(text, summary_type);
        let _guard = self.write_lock.lock();
        let now = self.clock.now();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.make_room(now);
        }

        self.entries.insert(
            key,
            CacheEntry {
                summary,
                created_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Drop everything stale; if that frees nothing, evict the oldest entry.
    fn make_room(&self, now: Instant) {
        self.entries
            .retain(|_, e| now.duration_since(e.created_at) < self.ttl);
        if self.entries.len() < self.capacity {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.created_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(key = %key, "cache full, evicted oldest entry");
        }
    }
}
