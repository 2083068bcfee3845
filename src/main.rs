use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use summary_gateway::clock::SystemClock;
use summary_gateway::config::{Args, Config};
use summary_gateway::logging::init_logging;
use summary_gateway::provider::GeminiProvider;
use summary_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine, the environment may already carry everything
    let _ = dotenvy::dotenv();
    init_logging();

    let args = Args::parse();
    let config = Config::try_from(args)?;

    let provider = GeminiProvider::new(
        config.api_key.clone(),
        config.api_base.clone(),
        config.model.clone(),
        config.timeout,
    )
    .context("failed to build provider client")?;

    let state = Arc::new(AppState::new(&config, Arc::new(provider), Arc::new(SystemClock)));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Summary gateway running on http://{}", addr);
    info!("Using model {} at {}", config.model, config.api_base);
    info!("Cache TTL: {} seconds, capacity {}", config.cache_ttl.as_secs(), config.cache_capacity);
    for limit in &config.limits {
        info!("Rate limit: {} requests per {}", limit.max_requests, limit.label);
    }

    summary_gateway::serve(listener, state).await?;
    Ok(())
}
