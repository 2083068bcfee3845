use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::error::AppError;
use crate::handlers::ClientKey;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE, RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{SummarizeRequest, SummarizeResponse, SummaryType};
use crate::state::AppState;

pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    ClientKey(caller): ClientKey,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError> {
    REQUEST_TOTAL.inc();

    if let Err(limited) = state.rate_limiter.check(&caller) {
        RATE_LIMITED.inc();
        return Err(limited.into());
    }

    let start_time = Instant::now();

    let Json(payload) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let text = payload.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("No text provided".to_string()));
    }

    let summary_type: SummaryType = payload
        .summary_type
        .as_deref()
        .unwrap_or(SummaryType::Paragraph.as_str())
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid summary type".to_string()))?;

    if let Some(summary) = state.cache.lookup(&text, summary_type) {
        CACHE_HITS.inc();
        info!(%caller, %summary_type, "cache hit");
        REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
        return Ok(Json(SummarizeResponse {
            summary,
            summary_type,
            cached: true,
        }));
    }
    CACHE_MISSES.inc();

    // concurrent misses for the same key each reach the provider
    let summary = state.summarizer.summarize(&text, summary_type).await?;

    state.cache.store(&text, summary_type, summary.clone());
    CACHE_SIZE.set(state.cache.len() as f64);

    let elapsed = start_time.elapsed();
    REQUEST_LATENCY.observe(elapsed.as_secs_f64());
    info!(%caller, %summary_type, elapsed_ms = elapsed.as_millis() as u64, "summary generated");

    Ok(Json(SummarizeResponse {
        summary,
        summary_type,
        cached: false,
    }))
}
