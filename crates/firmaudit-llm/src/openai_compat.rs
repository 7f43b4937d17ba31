//! OpenAI-compatible chat completions over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use firmaudit_types::SecretString;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Calls `POST {base_url}/chat/completions` with Bearer authentication.
pub struct OpenAiCompatProvider {
    config: LlmProviderConfig,
    http: reqwest::Client,
    api_key: SecretString,
}

impl OpenAiCompatProvider {
    /// Validate the settings and build the HTTP client.
    ///
    /// Fails with [`ProviderError::InvalidConfig`] on a blank key, a base URL
    /// that is not absolute http(s), or a client build failure.
    pub fn try_new(config: LlmProviderConfig, api_key: SecretString) -> Result<Self> {
        if api_key.is_blank() {
            return Err(ProviderError::InvalidConfig(format!(
                "{}: empty API key",
                config.name
            )));
        }

        let url = reqwest::Url::parse(&config.base_url).map_err(|e| {
            ProviderError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProviderError::InvalidConfig(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ProviderError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            api_key,
        })
    }

    pub fn config(&self) -> &LlmProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let mut req = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose())
            .header("Content-Type", "application/json");
        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.status_error(status, response, &request.model).await);
        }

        let body = response
            .text()
            .await
            .map_err(ProviderError::from_transport)?;
        let chat_response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;
        if chat_response.choices.is_empty() {
            return Err(ProviderError::InvalidResponse("response has no choices".into()));
        }

        debug!(
            provider = %self.config.name,
            model = %chat_response.model,
            usage = ?chat_response.usage,
            "chat completion response received"
        );
        Ok(chat_response)
    }
}

impl OpenAiCompatProvider {
    async fn status_error(
        &self,
        status: StatusCode,
        response: reqwest::Response,
        model: &str,
    ) -> ProviderError {
        let header_ms = retry_after_header_ms(&response);
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 if is_quota_exhausted(&body) => {
                warn!(provider = %self.config.name, "quota exhausted (not retryable)");
                ProviderError::RequestFailed(
                    error_message(&body)
                        .unwrap_or_else(|| "quota exhausted or billing limit reached".into()),
                )
            }
            429 => {
                let retry_after_ms = header_ms.or_else(|| retry_after_body_ms(&body)).unwrap_or(1000);
                warn!(provider = %self.config.name, retry_after_ms, "rate limited");
                ProviderError::RateLimited { retry_after_ms }
            }
            401 | 403 => ProviderError::AuthFailed(error_message(&body).unwrap_or(body)),
            404 => ProviderError::ModelNotFound(format!("model '{model}': {body}")),
            // Malformed model names and unsupported tunables land here.
            400 | 422 => ProviderError::InvalidConfig(format!(
                "HTTP {status} for model '{model}': {}",
                error_message(&body).unwrap_or(body)
            )),
            code if status.is_server_error() => ProviderError::ServerError { status: code, body },
            _ => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
        }
    }
}

/// Some platforms answer 429 for exhausted credit, which never clears on retry.
fn is_quota_exhausted(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["insufficient_quota", "quota exceeded", "billing", "spending limit", "credits"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// `{"error": {"message": "..."}}` or `{"error": "..."}` or `{"message": "..."}`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let msg = match value.get("error") {
        Some(err) => err
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| err.as_str()),
        None => value.get("message").and_then(|m| m.as_str()),
    };
    msg.map(String::from)
}

/// Numeric `Retry-After` seconds; HTTP-date values are ignored.
fn retry_after_header_ms(response: &reqwest::Response) -> Option<u64> {
    let raw = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?;
    let secs = raw.trim().parse::<f64>().ok()?;
    Some((secs.max(0.0) * 1000.0) as u64)
}

fn retry_after_body_ms(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("retry_after_ms").and_then(|v| v.as_u64()).or_else(|| {
        value
            .get("retry_after")
            .and_then(|v| v.as_f64())
            .map(|secs| (secs.max(0.0) * 1000.0) as u64)
    })
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}
