use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::ProviderError;
use crate::metrics::{PROVIDER_ERRORS, PROVIDER_REQUESTS};
use crate::models::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

// Longest slice of an upstream error body we keep in the message
const MAX_ERROR_BODY: usize = 512;

/// Anything that can turn a prompt into generated text.
///
/// One call is one upstream attempt; callers get either text or a
/// [`ProviderError`] saying why there is none.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String, ProviderError>;
}

// Gemini generateContent adapter
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn map_reqwest(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Transport(e.to_string())
        }
    }

    async fn call(&self, prompt: &str, config: GenerationConfig) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: Some(config),
        };

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| self.map_reqwest(e))?;

        if !status.is_success() {
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        parsed.first_text().ok_or(ProviderError::NotReady)
    }
}

#[async_trait]
impl SummaryProvider for GeminiProvider {
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String, ProviderError> {
        PROVIDER_REQUESTS.inc();
        debug!(model = %self.model, temperature = ?config.temperature, "calling provider");

        let result = self.call(prompt, config).await;
        if result.is_err() {
            PROVIDER_ERRORS.inc();
        }
        result
    }
}
