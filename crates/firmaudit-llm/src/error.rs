//! Transport error types.

use thiserror::Error;

/// Errors that can occur when talking to an LLM platform.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request failed with a non-success status or was refused.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The platform rejected the credentials (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 5xx.
    #[error("server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    /// HTTP 429.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The requested model does not exist on the platform (HTTP 404).
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The provider cannot be set up with the given parameters, or the
    /// platform refused the request shape (HTTP 400/422).
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// The platform answered with a body that is not a usable completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request did not finish within its deadline.
    #[error("timeout")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Rejections that mean the binding itself is unusable, not that the
    /// call was unlucky.
    pub fn is_setup_rejection(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthFailed(_)
                | ProviderError::ModelNotFound(_)
                | ProviderError::InvalidConfig(_)
        )
    }

    /// Map a `reqwest` failure, keeping timeouts distinct.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ProviderError::RateLimited {
                retry_after_ms: 1500
            }
            .to_string(),
            "rate limited: retry after 1500ms"
        );
        assert_eq!(
            ProviderError::ModelNotFound("gpt-5".into()).to_string(),
            "model not found: gpt-5"
        );
        assert_eq!(ProviderError::Timeout.to_string(), "timeout");
    }

    #[test]
    fn setup_rejections() {
        assert!(ProviderError::AuthFailed("bad key".into()).is_setup_rejection());
        assert!(ProviderError::ModelNotFound("m".into()).is_setup_rejection());
        assert!(ProviderError::InvalidConfig("url".into()).is_setup_rejection());
        assert!(!ProviderError::Timeout.is_setup_rejection());
        assert!(!ProviderError::RequestFailed("HTTP 500".into()).is_setup_rejection());
    }

    #[test]
    fn json_error_converts() {
        let err: ProviderError = serde_json::from_str::<serde_json::Value>("nope")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("json error:"));
    }
}
