//! Core data types for the firmaudit company analysis pipeline.
//!
//! This crate holds plain data shared by every other firmaudit crate:
//!
//! - [`config`]: provider registry entries, stage model assignments and
//!   the top-level [`PipelineConfig`](config::PipelineConfig)
//! - [`binding`]: the resolved [`ModelBinding`](binding::ModelBinding) a stage runs against
//! - [`stage`]: stage identifiers and per-stage results
//! - [`payload`]: the structured output schema of each stage
//! - [`report`]: the pipeline report, run outcome and run summary
//! - [`error`]: the error taxonomy shared by routing and execution
//! - [`secret`]: a redacting wrapper for API keys

pub mod binding;
pub mod config;
pub mod error;
pub mod payload;
pub mod report;
pub mod secret;
pub mod stage;

pub use binding::{BindingKey, ModelBinding, ModelParameters};
pub use config::{
    ConfigError, PipelineConfig, ProviderSpec, RetrySettings, StageModels, builtin_providers,
};
pub use error::{AuditError, ErrorKind, Result};
pub use payload::{
    AnswerRecord, AnswerSet, CompanyProfile, Confidence, ConfidenceBreakdown, Evaluation, QuestionSet,
    ScoreCard, StagePayload,
};
pub use report::{
    AbortReason, PipelineOutcome, PipelineReport, RecordError, RunSummary, StageBindingSummary,
};
pub use secret::SecretString;
pub use stage::{StageError, StageId, StageResult, StageStatus};
