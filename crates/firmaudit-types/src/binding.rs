//! Resolved provider+model bindings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tunable sampling parameters attached to a provider.
///
/// `temperature` and `max_tokens` are typed because every platform
/// understands them; anything else is kept in `extra` and forwarded to
/// the request body verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Sampling temperature (0.0 = deterministic).
    #[serde(default)]
    pub temperature: f64,

    /// Maximum number of tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Additional platform-specific tunables.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
            extra: BTreeMap::new(),
        }
    }
}

/// The (provider, model, parameters) tuple a stage actually runs against.
///
/// Produced by the resolver, never mutated afterwards. Two resolutions of
/// the same configuration string compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBinding {
    /// Registry name of the provider (e.g. "groq").
    pub provider: String,
    /// Concrete model identifier sent to the platform.
    pub model: String,
    /// Parameters copied from the provider spec.
    pub parameters: ModelParameters,
}

impl ModelBinding {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        parameters: ModelParameters,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            parameters,
        }
    }

    /// Identity used by the client cache.
    pub fn key(&self) -> BindingKey {
        BindingKey {
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }
}

impl fmt::Display for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Hashable (provider, model) pair keying the shared client cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingKey {
    pub provider: String,
    pub model: String,
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}
