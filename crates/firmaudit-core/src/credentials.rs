//! Credential lookup.
//!
//! The core only needs `get(provider) -> secret | absent`. The default
//! implementation reads one environment variable per provider, chosen from
//! the provider spec's `api_key_env` or the platform's conventional name.

use std::collections::HashMap;

use firmaudit_llm::platform_endpoint;
use firmaudit_types::{ProviderSpec, SecretString};

use crate::registry::ProviderRegistry;

/// Environment-style key/value source.
pub trait Environment: Send + Sync {
    /// Value of `name`, or `None` if unset.
    fn get_var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
pub struct NativeEnvironment;

impl Environment for NativeEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// In-memory environment, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Source of one API key per provider.
pub trait CredentialLookup: Send + Sync {
    /// The provider's secret; `None` when absent or blank.
    fn get(&self, provider: &str) -> Option<SecretString>;
}

/// Environment variable that holds a provider's key.
pub fn key_var(spec: &ProviderSpec) -> Option<String> {
    spec.api_key_env
        .clone()
        .or_else(|| platform_endpoint(&spec.platform).map(|p| p.api_key_env.to_string()))
}

/// Credentials read from an [`Environment`].
pub struct EnvCredentials<E: Environment = NativeEnvironment> {
    env: E,
    vars: HashMap<String, String>,
}

impl EnvCredentials<NativeEnvironment> {
    /// Process environment, variables chosen per registry entry.
    pub fn from_process(registry: &ProviderRegistry) -> Self {
        Self::new(NativeEnvironment, registry)
    }
}

impl<E: Environment> EnvCredentials<E> {
    pub fn new(env: E, registry: &ProviderRegistry) -> Self {
        let vars = registry
            .specs()
            .iter()
            .filter_map(|spec| key_var(spec).map(|var| (spec.name.clone(), var)))
            .collect();
        Self { env, vars }
    }

    /// Variable consulted for `provider`.
    pub fn var_for(&self, provider: &str) -> Option<&str> {
        self.vars.get(provider).map(String::as_str)
    }
}

impl<E: Environment> CredentialLookup for EnvCredentials<E> {
    fn get(&self, provider: &str) -> Option<SecretString> {
        let var = self.vars.get(provider)?;
        let secret = SecretString::new(self.env.get_var(var)?);
        (!secret.is_blank()).then_some(secret)
    }
}

/// Fixed provider → key map.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, SecretString>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl Into<String>, key: impl Into<SecretString>) -> Self {
        self.keys.insert(provider.into(), key.into());
        self
    }
}

impl CredentialLookup for StaticCredentials {
    fn get(&self, provider: &str) -> Option<SecretString> {
        self.keys.get(provider).filter(|k| !k.is_blank()).cloned()
    }
}
