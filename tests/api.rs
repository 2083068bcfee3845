use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

use summary_gateway::clock::{Clock, ManualClock, SystemClock};
use summary_gateway::config::Config;
use summary_gateway::error::ProviderError;
use summary_gateway::models::GenerationConfig;
use summary_gateway::provider::SummaryProvider;
use summary_gateway::rate_limit::Limit;
use summary_gateway::state::AppState;

// Provider stand-in: replies in order (repeating the last one), or fails
// when it has none. Counts calls.
struct FakeProvider {
    replies: Vec<String>,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn replying(text: &str) -> Arc<Self> {
        Self::sequence(&[text])
    }

    fn sequence(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Self::sequence(&[])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryProvider for FakeProvider {
    async fn generate(&self, _prompt: &str, _config: GenerationConfig) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(n.min(self.replies.len().saturating_sub(1)))
            .cloned()
            .ok_or(ProviderError::Timeout(Duration::from_secs(30)))
    }
}

fn test_config(per_minute: u32) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        api_key: "test-key".into(),
        model: "test-model".into(),
        api_base: "http://127.0.0.1:1".into(),
        timeout: Duration::from_secs(1),
        cache_ttl: Duration::from_secs(3600),
        cache_capacity: 100,
        limits: vec![Limit::per_minute(per_minute)],
    }
}

async fn spawn_app(provider: Arc<FakeProvider>, clock: Arc<dyn Clock>, per_minute: u32) -> String {
    let state = Arc::new(AppState::new(&test_config(per_minute), provider, clock));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        summary_gateway::serve(listener, state).await.unwrap();
    });
    format!("http://{addr}")
}

async fn summarize(base: &str, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("{base}/summarize"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let provider = FakeProvider::replying("A tidy summary.");
    let base = spawn_app(provider.clone(), Arc::new(SystemClock), 100).await;
    let body = json!({"text": "Long article text.", "type": "paragraph"});

    let (status, first) = summarize(&base, body.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(first["summary"], "A tidy summary.");
    assert_eq!(first["type"], "paragraph");
    assert_eq!(first["cached"], false);

    let (status, second) = summarize(&base, body).await;
    assert_eq!(status, 200);
    assert_eq!(second["summary"], first["summary"]);
    assert_eq!(second["cached"], true);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn cache_is_per_summary_type() {
    let provider = FakeProvider::replying("Same reply.");
    let base = spawn_app(provider.clone(), Arc::new(SystemClock), 100).await;

    summarize(&base, json!({"text": "t", "type": "paragraph"})).await;
    let (_, other) = summarize(&base, json!({"text": "t", "type": "two_paragraph"})).await;
    assert_eq!(other["cached"], false);
    assert_eq!(other["summary"], "Same reply.\n\nSame reply.");
}

#[tokio::test]
async fn expired_entry_is_regenerated() {
    let provider = FakeProvider::replying("Summary.");
    let clock = Arc::new(ManualClock::new());
    let base = spawn_app(provider.clone(), clock.clone(), 100).await;
    let body = json!({"text": "t", "type": "paragraph"});

    summarize(&base, body.clone()).await;
    clock.advance(Duration::from_secs(3600));

    let (status, again) = summarize(&base, body).await;
    assert_eq!(status, 200);
    assert_eq!(again["cached"], false);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn empty_text_is_rejected_for_every_type_without_calling_provider() {
    let provider = FakeProvider::replying("unused");
    let base = spawn_app(provider.clone(), Arc::new(SystemClock), 100).await;

    for kind in ["paragraph", "two_paragraph", "paragraph_bullet", "bullet", "nonsense"] {
        let (status, body) = summarize(&base, json!({"text": "", "type": kind})).await;
        assert_eq!(status, 400, "type {kind}");
        assert_eq!(body["error"], "No text provided");
    }

    let (status, _) = summarize(&base, json!({"type": "bullet"})).await;
    assert_eq!(status, 400);
    let (status, _) = summarize(&base, json!({"text": "   \n", "type": "bullet"})).await;
    assert_eq!(status, 400);

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let provider = FakeProvider::replying("unused");
    let base = spawn_app(provider.clone(), Arc::new(SystemClock), 100).await;

    for kind in ["bullets", "PARAGRAPH", ""] {
        let (status, body) = summarize(&base, json!({"text": "t", "type": kind})).await;
        assert_eq!(status, 400, "type {kind:?}");
        assert_eq!(body["error"], "Invalid summary type");
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn missing_type_defaults_to_paragraph() {
    let provider = FakeProvider::replying("Summary.");
    let base = spawn_app(provider, Arc::new(SystemClock), 100).await;

    let (status, body) = summarize(&base, json!({"text": "t"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["type"], "paragraph");
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let provider = FakeProvider::replying("unused");
    let base = spawn_app(provider, Arc::new(SystemClock), 100).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/summarize"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

fn bullet_count(body: &Value) -> usize {
    body["summary"]
        .as_str()
        .unwrap()
        .lines()
        .filter(|l| l.starts_with('•'))
        .count()
}

#[tokio::test]
async fn bullet_output_is_capped_at_five() {
    let reply = "One. Two. Three. Four. Five. Six. Seven. Eight.";
    let base = spawn_app(FakeProvider::replying(reply), Arc::new(SystemClock), 100).await;

    let (status, body) = summarize(&base, json!({"text": "t", "type": "bullet"})).await;
    assert_eq!(status, 200);
    assert_eq!(bullet_count(&body), 5);
}

#[tokio::test]
async fn paragraph_bullet_output_is_capped_at_five() {
    let provider = FakeProvider::sequence(&[
        "A short overview of the report.",
        "Sales rose. Margins held. Hiring paused. Debt shrank. Cash grew. Stock split.",
    ]);
    let base = spawn_app(provider.clone(), Arc::new(SystemClock), 100).await;

    let (status, body) = summarize(&base, json!({"text": "t", "type": "paragraph_bullet"})).await;
    assert_eq!(status, 200);
    let summary = body["summary"].as_str().unwrap();
    assert!(summary.starts_with("A short overview of the report.\n\n"));
    assert_eq!(bullet_count(&body), 5);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn cross_origin_callers_get_cors_headers() {
    let base = spawn_app(FakeProvider::replying("Summary."), Arc::new(SystemClock), 100).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/summarize"))
        .header("origin", "https://other.example")
        .json(&json!({"text": "t", "type": "paragraph"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().contains_key("access-control-allow-origin"));

    let preflight = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/summarize"))
        .header("origin", "https://other.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert!(preflight.headers().contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn provider_failure_is_a_server_error_and_not_cached() {
    let provider = FakeProvider::failing();
    let base = spawn_app(provider.clone(), Arc::new(SystemClock), 100).await;
    let body = json!({"text": "t", "type": "bullet"});

    let (status, err) = summarize(&base, body.clone()).await;
    assert_eq!(status, 500);
    let msg = err["error"].as_str().unwrap();
    assert!(msg.starts_with("Error generating summary:"));
    assert!(msg.contains("timed out"));
    assert!(err.get("summary").is_none());

    let (status, _) = summarize(&base, body).await;
    assert_eq!(status, 500);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn caller_is_throttled_after_limit() {
    let provider = FakeProvider::replying("Summary.");
    let base = spawn_app(provider, Arc::new(SystemClock), 2).await;
    let body = json!({"text": "t", "type": "paragraph"});

    assert_eq!(summarize(&base, body.clone()).await.0, 200);
    assert_eq!(summarize(&base, body.clone()).await.0, 200);

    let (status, err) = summarize(&base, body).await;
    assert_eq!(status, 429);
    assert!(err["error"].as_str().unwrap().contains("2 per minute"));
}

#[tokio::test]
async fn index_and_health_are_served() {
    let base = spawn_app(FakeProvider::replying("x"), Arc::new(SystemClock), 100).await;
    let client = reqwest::Client::new();

    let page = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(page.status().as_u16(), 200);
    assert!(page.text().await.unwrap().contains("/summarize"));

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
}
