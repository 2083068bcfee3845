mod client;
mod health;
mod index;
mod metrics;
mod summarize;

pub use client::ClientKey;
pub use health::health_handler;
pub use index::index_handler;
pub use metrics::metrics_handler;
pub use summarize::summarize_handler;
