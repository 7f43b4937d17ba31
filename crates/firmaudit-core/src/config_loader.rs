//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path (the CLI's `--config`).
//! 2. `FIRMAUDIT_CONFIG` environment variable.
//! 3. `~/.firmaudit/config.json`
//! 4. If none found, the built-in defaults.
//!
//! JSON keys are normalized from camelCase to snake_case before
//! deserializing, so `timeoutSecs` and `timeout_secs` are equivalent.

use std::path::{Path, PathBuf};

use firmaudit_types::{ConfigError, PipelineConfig};
use serde_json::Value;

use crate::credentials::Environment;
use crate::registry::ProviderRegistry;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "FIRMAUDIT_CONFIG";

/// Where a config file would be read from, if anywhere.
///
/// Explicit and environment paths are returned as-is; the home directory
/// candidate only if it exists.
pub fn discover_config_path(
    explicit: Option<&Path>,
    env: &dyn Environment,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(env_path) = env.get_var(CONFIG_ENV_VAR)
        && !env_path.trim().is_empty()
    {
        return Some(PathBuf::from(env_path));
    }

    let candidate = home_dir?.join(".firmaudit").join("config.json");
    candidate.exists().then_some(candidate)
}

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PipelineConfig,
    pub source: Option<PathBuf>,
}

/// Discover, read, normalize, parse and validate.
///
/// An explicit path must exist. A missing `FIRMAUDIT_CONFIG` target falls
/// back to defaults with a warning.
pub async fn load_config(
    explicit: Option<&Path>,
    env: &dyn Environment,
    home_dir: Option<PathBuf>,
) -> Result<LoadedConfig, ConfigError> {
    let Some(path) = discover_config_path(explicit, env, home_dir) else {
        tracing::info!("no config file found, using defaults");
        return Ok(LoadedConfig {
            config: PipelineConfig::default(),
            source: None,
        });
    };

    if explicit.is_none() && !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "config path does not exist, using defaults"
        );
        return Ok(LoadedConfig {
            config: PipelineConfig::default(),
            source: None,
        });
    }

    tracing::debug!(path = %path.display(), "loading config file");
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

    let config = parse_config(&contents, &path)?;
    Ok(LoadedConfig {
        config,
        source: Some(path),
    })
}

/// Parse config JSON (camelCase or snake_case keys) and validate it.
pub fn parse_config(contents: &str, path: &Path) -> Result<PipelineConfig, ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let raw: Value = serde_json::from_str(contents).map_err(parse_err)?;
    let config: PipelineConfig = serde_json::from_value(normalize_keys(raw)).map_err(parse_err)?;
    validate(&config)?;
    Ok(config)
}

/// Checks serde cannot express.
pub fn validate(config: &PipelineConfig) -> Result<(), ConfigError> {
    ProviderRegistry::from_specs(config.providers.clone())?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
    }
    if config.retry.max_backoff_ms < config.retry.initial_backoff_ms {
        return Err(ConfigError::Invalid(format!(
            "retry.max_backoff_ms ({}) is below retry.initial_backoff_ms ({})",
            config.retry.max_backoff_ms, config.retry.initial_backoff_ms
        )));
    }
    for (stage, spec) in config.stages.iter() {
        if spec.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{} ({}) has no model specification",
                stage.config_key(),
                stage
            )));
        }
    }
    Ok(())
}

/// Convert camelCase JSON keys to snake_case recursively.
///
/// A provider's `parameters` object is the exception: only the typed
/// fields (`temperature`, `max_tokens`) are renamed, and every other
/// key is a platform tunable passed through exactly as written.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| {
                    let key = camel_to_snake(&key);
                    let val = match key.as_str() {
                        "providers" => normalize_providers(val),
                        _ => normalize_keys(val),
                    };
                    (key, val)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn normalize_providers(value: Value) -> Value {
    let Value::Array(providers) = value else {
        return normalize_keys(value);
    };
    let providers = providers.into_iter().map(|provider| match provider {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, val)| {
                    let key = camel_to_snake(&key);
                    let val = match key.as_str() {
                        "parameters" => normalize_parameters(val),
                        _ => normalize_keys(val),
                    };
                    (key, val)
                })
                .collect(),
        ),
        other => normalize_keys(other),
    });
    Value::Array(providers.collect())
}

fn normalize_parameters(value: Value) -> Value {
    const TYPED: [&str; 2] = ["temperature", "max_tokens"];
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| {
                    let snake = camel_to_snake(&key);
                    if TYPED.contains(&snake.as_str()) {
                        (snake, val)
                    } else {
                        (key, val)
                    }
                })
                .collect(),
        ),
        other => other,
    }
}

/// Convert a single camelCase string to snake_case.
///
/// A run of capitals is kept together as one word, so `"HTMLParser"`
/// becomes `"html_parser"`.
///
/// # Examples
/// ```
/// # use firmaudit_core::config_loader::camel_to_snake;
/// assert_eq!(camel_to_snake("timeoutSecs"), "timeout_secs");
/// assert_eq!(camel_to_snake("apiKeyEnv"), "api_key_env");
/// assert_eq!(camel_to_snake("already_snake"), "already_snake");
/// assert_eq!(camel_to_snake("baseURL"), "base_url");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            // Word boundary: lower->Upper, or the last capital of an acronym.
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(|c| c.is_lowercase()))
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}
