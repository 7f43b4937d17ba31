//! Stage model specification parsing and resolution.
//!
//! Grammar: `provider` or `provider:model`. Only the first `:` splits, so
//! model identifiers containing `:` or `/` (e.g. `groq:openai/gpt-oss-120b`)
//! survive intact.

use firmaudit_types::{AuditError, ModelBinding, StageId};
use tracing::debug;

use crate::registry::ProviderRegistry;

/// Parsed form of a stage model string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec<'a> {
    pub provider: &'a str,
    /// `None` when the string names only the provider or ends with `:`.
    pub model: Option<&'a str>,
}

impl<'a> ModelSpec<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(':') {
            None => Self {
                provider: raw.trim(),
                model: None,
            },
            // "groq:" carries no override; the provider default applies.
            Some((provider, model)) if model.trim().is_empty() => Self {
                provider: provider.trim(),
                model: None,
            },
            Some((provider, model)) => Self {
                provider: provider.trim(),
                model: Some(model.trim()),
            },
        }
    }
}

/// Turns stage model strings into [`ModelBinding`]s. Pure.
#[derive(Debug, Clone, Copy)]
pub struct ModelResolver<'r> {
    registry: &'r ProviderRegistry,
}

impl<'r> ModelResolver<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, stage: StageId, raw: &str) -> Result<ModelBinding, AuditError> {
        let spec = ModelSpec::parse(raw);
        let provider = self.registry.lookup(spec.provider)?;
        if !provider.enabled {
            return Err(AuditError::ProviderDisabled {
                provider: provider.name.clone(),
            });
        }

        let model = spec.model.unwrap_or(&provider.default_model);
        let binding = ModelBinding::new(&provider.name, model, provider.parameters.clone());
        debug!(stage = %stage, spec = raw, binding = %binding, "resolved stage model");
        Ok(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmaudit_types::{ErrorKind, ProviderSpec};

    fn registry() -> ProviderRegistry {
        ProviderRegistry::builtin()
    }

    #[test]
    fn parse_provider_only() {
        assert_eq!(
            ModelSpec::parse("gemini"),
            ModelSpec {
                provider: "gemini",
                model: None
            }
        );
    }

    #[test]
    fn parse_splits_on_first_colon() {
        let spec = ModelSpec::parse("groq:openai/gpt-oss-120b");
        assert_eq!(spec.provider, "groq");
        assert_eq!(spec.model, Some("openai/gpt-oss-120b"));

        let spec = ModelSpec::parse("local:llama3:8b");
        assert_eq!(spec.provider, "local");
        assert_eq!(spec.model, Some("llama3:8b"));
    }

    #[test]
    fn parse_trailing_colon_is_no_override() {
        assert_eq!(ModelSpec::parse("groq:").model, None);
        assert_eq!(ModelSpec::parse("groq:   ").model, None);
        assert_eq!(ModelSpec::parse("groq:").provider, "groq");
    }

    #[test]
    fn parse_trims_whitespace() {
        let spec = ModelSpec::parse("  cohere : command-r ");
        assert_eq!(spec.provider, "cohere");
        assert_eq!(spec.model, Some("command-r"));
    }

    #[test]
    fn default_model_applied() {
        let reg = registry();
        let r = ModelResolver::new(&reg);
        for name in reg.enabled_providers() {
            let binding = r.resolve(StageId::GatherDetails, &name).unwrap();
            assert_eq!(binding.model, reg.get(&name).unwrap().default_model);
            assert_eq!(binding.provider, name);
        }
    }

    #[test]
    fn override_applied() {
        let reg = registry();
        let binding = ModelResolver::new(&reg)
            .resolve(StageId::GenerateQuestions, "groq:llama-3.3-70b-versatile")
            .unwrap();
        assert_eq!(binding.to_string(), "groq:llama-3.3-70b-versatile");
    }

    #[test]
    fn trailing_colon_resolves_to_default() {
        let reg = registry();
        let r = ModelResolver::new(&reg);
        assert_eq!(
            r.resolve(StageId::ScoreResults, "cohere:").unwrap(),
            r.resolve(StageId::ScoreResults, "cohere").unwrap()
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let reg = registry();
        let r = ModelResolver::new(&reg);
        let a = r.resolve(StageId::AnswerQuestions, "groq:openai/gpt-oss-120b").unwrap();
        let b = r.resolve(StageId::AnswerQuestions, "groq:openai/gpt-oss-120b").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parameters_copied_from_spec() {
        let mut spec = ProviderSpec::new("hot", "groq", "m");
        spec.parameters.temperature = 0.7;
        spec.parameters.max_tokens = Some(512);
        let reg = ProviderRegistry::from_specs(vec![spec]).unwrap();
        let binding = ModelResolver::new(&reg).resolve(StageId::GatherDetails, "hot").unwrap();
        assert_eq!(binding.parameters.temperature, 0.7);
        assert_eq!(binding.parameters.max_tokens, Some(512));
    }

    #[test]
    fn unknown_provider() {
        let reg = registry();
        let r = ModelResolver::new(&reg);
        for raw in ["anthropic", "anthropic:claude", "", ":model"] {
            let err = r.resolve(StageId::GatherDetails, raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownProvider, "input {raw:?}");
        }
    }

    #[test]
    fn disabled_provider() {
        let reg = registry();
        let r = ModelResolver::new(&reg);
        let err = r.resolve(StageId::GatherDetails, "openai:gpt-4o").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderDisabled);
        let err = r.resolve(StageId::GatherDetails, "mistral").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderDisabled);
    }
}
