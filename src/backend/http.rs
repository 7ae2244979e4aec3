//! HTTP decision backend for chat-completions proxies.
//!
//! Speaks the widely-mirrored chat-completions wire shape
//! (`{model, messages, max_tokens, temperature}` in,
//! `choices[0].message.content` out), which is what most gateway/proxy
//! deployments expose regardless of the upstream provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::{Error, Result};

use super::types::ChatMessage;
use super::DecisionBackend;

/// Default maximum in-flight requests per backend.
pub const DEFAULT_MAX_PARALLEL: usize = 5;

/// Configuration for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Full URL of the chat-completions endpoint.
    pub api_url: String,
    /// Bearer token sent in the Authorization header.
    pub api_key: String,
    /// Model identifier forwarded to the endpoint.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum parallel requests issued by `sample_n`.
    pub max_parallel: usize,
}

impl BackendConfig {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: 120,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// A [`DecisionBackend`] backed by an HTTP chat-completions endpoint.
///
/// Rate limiting and connection pooling are this client's own discipline:
/// `sample_n` fans out over a bounded semaphore so that a burst of
/// `n x (1 + m)` sampling calls from the estimator never floods the proxy.
pub struct HttpBackend {
    config: BackendConfig,
    http: Client,
    permits: Arc<Semaphore>,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        let permits = Arc::new(Semaphore::new(config.max_parallel));

        Ok(Self {
            config,
            http,
            permits,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f64>,
        max_tokens: u32,
    ) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens,
            temperature,
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::backend_unavailable(e.to_string())
                } else {
                    Error::backend("http", e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::backend("http", format!("{status}: {detail}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::backend("http", format!("malformed response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::backend("http", "response contained no choices".to_string()))
    }
}

#[async_trait]
impl DecisionBackend for HttpBackend {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Internal("backend semaphore closed".to_string()))?;
        self.request(messages, None, 1024).await
    }

    async fn sample_n(
        &self,
        messages: &[ChatMessage],
        n: usize,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<Vec<String>> {
        let draws = (0..n).map(|_| async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| Error::Internal("backend semaphore closed".to_string()))?;
            self.request(messages, Some(temperature), max_tokens).await
        });

        let results = join_all(draws).await;

        // All draws failing to reach the host means the backend is down for
        // this call; a partial failure degrades those draws to empty
        // completions, which classify as declines downstream.
        if !results.is_empty() && results.iter().all(|r| r.is_err()) {
            let unreachable = results
                .iter()
                .all(|r| matches!(r, Err(e) if e.is_backend_unavailable()));
            if unreachable {
                return Err(Error::backend_unavailable(format!(
                    "all {n} sampling calls failed to reach {}",
                    self.config.api_url
                )));
            }
        }

        Ok(results
            .into_iter()
            .map(|r| match r {
                Ok(text) => text,
                Err(e) => {
                    warn!("sample degraded to decline: {e}");
                    String::new()
                }
            })
            .collect())
    }
}
