use std::sync::Arc;

use crate::cache::SummaryCache;
use crate::clock::Clock;
use crate::config::Config;
use crate::provider::SummaryProvider;
use crate::rate_limit::RateLimiter;
use crate::summary::Summarizer;

// app's shared state
pub struct AppState {
    pub cache: SummaryCache,
    pub rate_limiter: RateLimiter,
    pub summarizer: Summarizer,
}

impl AppState {
    pub fn new(config: &Config, provider: Arc<dyn SummaryProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: SummaryCache::new(config.cache_ttl, config.cache_capacity, clock.clone()),
            rate_limiter: RateLimiter::new(config.limits.clone(), clock),
            summarizer: Summarizer::new(provider),
        }
    }
}
