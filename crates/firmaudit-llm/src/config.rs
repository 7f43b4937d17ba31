//! Platform endpoints and per-provider connection settings.
//!
//! A provider entry in the registry names a *platform*; the platform fixes
//! the OpenAI-compatible base URL and the conventional API key variable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Where a platform's OpenAI-compatible API lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformEndpoint {
    pub platform: &'static str,
    pub base_url: &'static str,
    pub api_key_env: &'static str,
}

const PLATFORMS: &[PlatformEndpoint] = &[
    PlatformEndpoint {
        platform: "google",
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
        api_key_env: "GOOGLE_API_KEY",
    },
    PlatformEndpoint {
        platform: "openai",
        base_url: "https://api.openai.com/v1",
        api_key_env: "OPENAI_API_KEY",
    },
    PlatformEndpoint {
        platform: "cohere",
        base_url: "https://api.cohere.ai/compatibility/v1",
        api_key_env: "COHERE_API_KEY",
    },
    PlatformEndpoint {
        platform: "mistral",
        base_url: "https://api.mistral.ai/v1",
        api_key_env: "MISTRAL_API_KEY",
    },
    PlatformEndpoint {
        platform: "groq",
        base_url: "https://api.groq.com/openai/v1",
        api_key_env: "GROQ_API_KEY",
    },
];

/// All known platforms.
pub fn builtin_platforms() -> &'static [PlatformEndpoint] {
    PLATFORMS
}

/// Endpoint for a platform name (case-insensitive).
pub fn platform_endpoint(platform: &str) -> Option<&'static PlatformEndpoint> {
    let platform = platform.trim();
    PLATFORMS
        .iter()
        .find(|p| p.platform.eq_ignore_ascii_case(platform))
}

/// Connection settings for one [`OpenAiCompatProvider`](crate::OpenAiCompatProvider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider name used in logs (e.g. "gemini").
    pub name: String,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Extra HTTP headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Whole-request timeout enforced by the HTTP client. `None` leaves
    /// the deadline to the caller.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl LlmProviderConfig {
    /// Settings for `name` talking to a known platform.
    pub fn for_platform(name: impl Into<String>, platform: &str) -> Result<Self> {
        let endpoint = platform_endpoint(platform)
            .ok_or_else(|| ProviderError::InvalidConfig(format!("unknown platform '{platform}'")))?;
        Ok(Self::with_base_url(name, endpoint.base_url))
    }

    pub fn with_base_url(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            headers: HashMap::new(),
            timeout_secs: None,
        }
    }
}
