use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::clock::Clock;

// Sweep idle callers once every this many checks
const PRUNE_EVERY: u64 = 256;

// One fixed window rule, e.g. 10 requests per 60 seconds
#[derive(Debug, Clone)]
pub struct Limit {
    pub max_requests: u32,
    pub window: Duration,
    pub label: String,
}

impl Limit {
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60), "minute")
    }

    pub fn per_hour(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60 * 60), "hour")
    }

    pub fn per_day(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(24 * 60 * 60), "day")
    }

    pub fn new(max_requests: u32, window: Duration, label: &str) -> Self {
        Self {
            max_requests,
            window,
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded: {max_requests} per {label}. Try again later.")]
pub struct RateLimitExceeded {
    pub max_requests: u32,
    pub label: String,
}

// Rate limit entry - tracks one window for one caller
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

/// Per-caller fixed-window limiter. A request is admitted only when every
/// configured window still has room; rejected requests are not counted.
pub struct RateLimiter {
    limits: Vec<Limit>,
    entries: DashMap<String, Vec<RateLimitEntry>>,
    clock: Arc<dyn Clock>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(limits: Vec<Limit>, clock: Arc<dyn Clock>) -> Self {
        Self {
            limits,
            entries: DashMap::new(),
            clock,
            checks: AtomicU64::new(0),
        }
    }

    pub fn check(&self, caller: &str) -> Result<(), RateLimitExceeded> {
        let now = self.clock.now();

        // must run before the entry guard below is taken, retain locks every shard
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_idle(now);
        }

        let mut windows = self
            .entries
            .entry(caller.to_string())
            .or_insert_with(|| {
                vec![
                    RateLimitEntry {
                        count: 0,
                        window_start: now,
                    };
                    self.limits.len()
                ]
            });

        // window expired..? Reset it
        for (entry, limit) in windows.iter_mut().zip(&self.limits) {
            if now.duration_since(entry.window_start) >= limit.window {
                entry.count = 0;
                entry.window_start = now;
            }
        }

        // over any limit..? Reject without counting
        if let Some(limit) = windows
            .iter()
            .zip(&self.limits)
            .find(|(entry, limit)| entry.count >= limit.max_requests)
            .map(|(_, limit)| limit)
        {
            return Err(RateLimitExceeded {
                max_requests: limit.max_requests,
                label: limit.label.clone(),
            });
        }

        for entry in windows.iter_mut() {
            entry.count += 1;
        }
        Ok(())
    }

    /// Forgets callers whose every window has run out. Such a caller would
    /// start from zero on its next request anyway.
    pub fn prune_idle(&self, now: Instant) {
        self.entries.retain(|_, windows| {
            windows
                .iter()
                .zip(&self.limits)
                .any(|(entry, limit)| now.duration_since(entry.window_start) < limit.window)
        });
    }

    pub fn tracked_callers(&self) -> usize {
        self.entries.len()
    }
}
