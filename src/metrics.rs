use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("summary_requests_total", "Total number of summarize requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("summary_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("summary_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("summary_cache_misses_total", "Total cache misses").unwrap();
    pub static ref PROVIDER_REQUESTS: Counter =
        register_counter!("summary_provider_requests_total", "Calls made to the summarization provider").unwrap();
    pub static ref PROVIDER_ERRORS: Counter =
        register_counter!("summary_provider_errors_total", "Failed calls to the summarization provider").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "summary_request_latency_seconds",
        "Summarize request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("summary_cache_size", "Current number of items in cache").unwrap();
}

// Render every registered metric in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
