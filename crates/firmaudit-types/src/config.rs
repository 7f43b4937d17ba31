//! Pipeline configuration types.
//!
//! A [`PipelineConfig`] is read once at startup. It names the known
//! providers ([`ProviderSpec`]), assigns a model specification string to
//! each stage ([`StageModels`]), and carries the retry, timeout and output
//! settings. Every section has a default, so a partial (or absent) config
//! file still yields a runnable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::ModelParameters;
use crate::stage::StageId;

/// A known provider entry in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Unique registry key (e.g. "gemini"). Stage specs refer to this.
    pub name: String,

    /// Disabled providers stay visible to lookups but are never bound.
    #[serde(default)]
    pub enabled: bool,

    /// Underlying vendor platform (e.g. "google", "openai", "groq").
    pub platform: String,

    /// Model used when a stage spec names only the provider.
    pub default_model: String,

    /// Tunable parameters forwarded with every call.
    #[serde(default)]
    pub parameters: ModelParameters,

    /// Environment variable holding the API key. Defaults to the
    /// platform's conventional variable when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Override for the platform's API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderSpec {
    /// An enabled spec with default parameters.
    pub fn new(
        name: impl Into<String>,
        platform: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            platform: platform.into(),
            default_model: default_model.into(),
            parameters: ModelParameters::default(),
            api_key_env: None,
            base_url: None,
        }
    }

    /// Builder-style toggle of the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Returns the built-in provider table.
///
/// Gemini, Cohere and Groq are on; OpenAI and Mistral are known but off.
/// All run at temperature 0.
pub fn builtin_providers() -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::new("gemini", "google", "gemini-3-flash-preview"),
        ProviderSpec::new("openai", "openai", "gpt-4").enabled(false),
        ProviderSpec::new("cohere", "cohere", "command-a-03-2025"),
        ProviderSpec::new("mistral", "mistral", "mistral-large-latest").enabled(false),
        ProviderSpec::new("groq", "groq", "llama-3.3-70b-versatile"),
    ]
}

/// Model specification string per stage: `"provider"` or `"provider:model"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageModels {
    #[serde(default = "default_stage_1")]
    pub stage_1_gather_details: String,
    #[serde(default = "default_stage_2")]
    pub stage_2_generate_questions: String,
    #[serde(default = "default_stage_3")]
    pub stage_3_answer_questions: String,
    #[serde(default = "default_stage_4")]
    pub stage_4_score_results: String,
}

fn default_stage_1() -> String {
    "gemini".into()
}
fn default_stage_2() -> String {
    "groq:llama-3.3-70b-versatile".into()
}
fn default_stage_3() -> String {
    "groq:openai/gpt-oss-120b".into()
}
fn default_stage_4() -> String {
    "cohere".into()
}

impl Default for StageModels {
    fn default() -> Self {
        Self {
            stage_1_gather_details: default_stage_1(),
            stage_2_generate_questions: default_stage_2(),
            stage_3_answer_questions: default_stage_3(),
            stage_4_score_results: default_stage_4(),
        }
    }
}

impl StageModels {
    /// Build an assignment from four spec strings, in stage order.
    pub fn new(
        gather: impl Into<String>,
        generate: impl Into<String>,
        answer: impl Into<String>,
        score: impl Into<String>,
    ) -> Self {
        Self {
            stage_1_gather_details: gather.into(),
            stage_2_generate_questions: generate.into(),
            stage_3_answer_questions: answer.into(),
            stage_4_score_results: score.into(),
        }
    }

    /// The spec string configured for `stage`.
    pub fn get(&self, stage: StageId) -> &str {
        match stage {
            StageId::GatherDetails => &self.stage_1_gather_details,
            StageId::GenerateQuestions => &self.stage_2_generate_questions,
            StageId::AnswerQuestions => &self.stage_3_answer_questions,
            StageId::ScoreResults => &self.stage_4_score_results,
        }
    }

    /// Replace the spec string for `stage`.
    pub fn set(&mut self, stage: StageId, spec: impl Into<String>) {
        let slot = match stage {
            StageId::GatherDetails => &mut self.stage_1_gather_details,
            StageId::GenerateQuestions => &mut self.stage_2_generate_questions,
            StageId::AnswerQuestions => &mut self.stage_3_answer_questions,
            StageId::ScoreResults => &mut self.stage_4_score_results,
        };
        *slot = spec.into();
    }

    /// All (stage, spec) pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (StageId, &str)> {
        StageId::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// Bounded retry settings for in-flight provider calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Additional attempts after the first call (default: 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first retry, doubled each time (default: 2000).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff (default: 30000).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    2_000
}
fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Provider registry entries. Names must be unique.
    #[serde(default = "builtin_providers")]
    pub providers: Vec<ProviderSpec>,

    /// Model specification per stage.
    #[serde(default)]
    pub stages: StageModels,

    /// Retry policy for transient provider errors.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-call timeout in seconds (default: 120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory that receives persisted reports (default: "output").
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_timeout_secs() -> u64 {
    120
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            providers: builtin_providers(),
            stages: StageModels::default(),
            retry: RetrySettings::default(),
            timeout_secs: default_timeout_secs(),
            output_dir: default_output_dir(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Two registry entries share a name.
    #[error("provider '{0}' is defined more than once")]
    DuplicateProvider(String),

    /// Configuration is semantically invalid.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`PipelineConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
