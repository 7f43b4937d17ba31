//! Static table of known providers.

use std::collections::HashMap;

use firmaudit_types::{AuditError, ConfigError, ProviderSpec, builtin_providers};

/// Read-only provider table, built once at startup.
///
/// Disabled providers stay visible to [`get`](Self::get) and
/// [`lookup`](Self::lookup) so diagnostics can name them, but never appear
/// in [`enabled_providers`](Self::enabled_providers).
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    specs: Vec<ProviderSpec>,
    index: HashMap<String, usize>,
}

impl ProviderRegistry {
    /// Build from specs, rejecting duplicate or blank names.
    pub fn from_specs(specs: Vec<ProviderSpec>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "provider #{} has an empty name",
                    i + 1
                )));
            }
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateProvider(spec.name.clone()));
            }
        }
        Ok(Self { specs, index })
    }

    /// The built-in five-provider table.
    pub fn builtin() -> Self {
        let specs = builtin_providers();
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Self { specs, index }
    }

    pub fn get(&self, name: &str) -> Option<&ProviderSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Like [`get`](Self::get) but with the taxonomy error for absence.
    pub fn lookup(&self, name: &str) -> Result<&ProviderSpec, AuditError> {
        self.get(name).ok_or_else(|| AuditError::UnknownProvider {
            provider: name.to_string(),
        })
    }

    /// Names of enabled providers, sorted.
    pub fn enabled_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .specs
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names
    }

    /// All names in configuration order.
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn specs(&self) -> &[ProviderSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
