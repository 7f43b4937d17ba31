//! Provider client construction and the per-run client cache.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use firmaudit_llm::{
    ChatMessage, ChatRequest, LlmProviderConfig, OpenAiCompatProvider, Provider, ProviderError,
    platform_endpoint,
};
use firmaudit_types::{AuditError, BindingKey, ModelBinding, ProviderSpec, SecretString};
use tracing::{debug, info};

use crate::credentials::CredentialLookup;
use crate::registry::ProviderRegistry;

/// Builds the transport for one binding.
///
/// Implementations validate the setup and return
/// [`AuditError::ClientInit`] when the platform would reject it.
pub trait ClientBuilder: Send + Sync {
    fn build(
        &self,
        spec: &ProviderSpec,
        binding: &ModelBinding,
        api_key: SecretString,
    ) -> Result<Arc<dyn Provider>, AuditError>;
}

/// Builds [`OpenAiCompatProvider`]s against the platform endpoint table.
#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder;

impl ClientBuilder for HttpClientBuilder {
    fn build(
        &self,
        spec: &ProviderSpec,
        binding: &ModelBinding,
        api_key: SecretString,
    ) -> Result<Arc<dyn Provider>, AuditError> {
        let init_err = |reason: String| AuditError::ClientInit {
            provider: binding.provider.clone(),
            model: binding.model.clone(),
            reason,
        };

        if binding.model.trim().is_empty() {
            return Err(init_err("model name is blank".into()));
        }
        if binding.model.chars().any(char::is_whitespace) {
            return Err(init_err(format!("malformed model name '{}'", binding.model)));
        }

        let config = match &spec.base_url {
            Some(url) => LlmProviderConfig::with_base_url(&spec.name, url),
            None => {
                if platform_endpoint(&spec.platform).is_none() {
                    return Err(init_err(format!("unknown platform '{}'", spec.platform)));
                }
                LlmProviderConfig::for_platform(&spec.name, &spec.platform)
                    .map_err(|e| init_err(e.to_string()))?
            }
        };

        let provider = OpenAiCompatProvider::try_new(config, api_key)
            .map_err(|e| init_err(e.to_string()))?;
        Ok(Arc::new(provider))
    }
}

/// A callable client for one (provider, model) pair.
pub struct ModelClient {
    binding: ModelBinding,
    provider: Arc<dyn Provider>,
}

impl ModelClient {
    pub fn new(binding: ModelBinding, provider: Arc<dyn Provider>) -> Self {
        Self { binding, provider }
    }

    pub fn binding(&self) -> &ModelBinding {
        &self.binding
    }

    /// Send `prompt` as a single user message and return the reply text.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let params = &self.binding.parameters;
        let mut request = ChatRequest::new(&self.binding.model, vec![ChatMessage::user(prompt)]);
        request.temperature = Some(params.temperature);
        request.max_tokens = params.max_tokens;
        request.extra = params.extra.clone();

        let response = self.provider.complete(&request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("empty completion".into()))
    }
}

impl fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("binding", &self.binding.to_string())
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Hands out one shared client per distinct binding.
///
/// Get-or-create holds the cache entry lock for the key, so concurrent
/// callers construct at most one client per (provider, model). Failed
/// constructions leave nothing behind.
pub struct ClientFactory {
    registry: Arc<ProviderRegistry>,
    builder: Arc<dyn ClientBuilder>,
    cache: DashMap<BindingKey, Arc<ModelClient>>,
    constructed: AtomicUsize,
}

impl ClientFactory {
    pub fn new(registry: Arc<ProviderRegistry>, builder: Arc<dyn ClientBuilder>) -> Self {
        Self {
            registry,
            builder,
            cache: DashMap::new(),
            constructed: AtomicUsize::new(0),
        }
    }

    /// HTTP clients over the platform endpoint table.
    pub fn http(registry: Arc<ProviderRegistry>) -> Self {
        Self::new(registry, Arc::new(HttpClientBuilder))
    }

    pub fn get_client(
        &self,
        binding: &ModelBinding,
        credentials: &dyn CredentialLookup,
    ) -> Result<Arc<ModelClient>, AuditError> {
        match self.cache.entry(binding.key()) {
            Entry::Occupied(entry) => {
                debug!(binding = %binding, "client cache hit");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                let spec = self.registry.lookup(&binding.provider)?;
                let api_key = credentials
                    .get(&binding.provider)
                    .ok_or_else(|| AuditError::MissingCredential {
                        provider: binding.provider.clone(),
                    })?;
                let provider = self.builder.build(spec, binding, api_key)?;
                let client = Arc::new(ModelClient::new(binding.clone(), provider));
                entry.insert(Arc::clone(&client));
                self.constructed.fetch_add(1, Ordering::Relaxed);
                info!(binding = %binding, "provider client initialized");
                Ok(client)
            }
        }
    }

    /// Drop a cached client; the next request rebuilds it.
    pub fn evict(&self, binding: &ModelBinding) -> bool {
        let removed = self.cache.remove(&binding.key()).is_some();
        if removed {
            debug!(binding = %binding, "client evicted");
        }
        removed
    }

    /// Clients currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Clients built over the factory's lifetime.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}
