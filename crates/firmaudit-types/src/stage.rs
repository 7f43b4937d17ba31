//! Stage identifiers and per-stage results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::binding::ModelBinding;
use crate::error::{AuditError, ErrorKind};
use crate::payload::{ConfidenceBreakdown, StagePayload};

/// The four fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    GatherDetails,
    GenerateQuestions,
    AnswerQuestions,
    ScoreResults,
}

impl StageId {
    /// Every stage in pipeline order.
    pub const ALL: [StageId; 4] = [
        StageId::GatherDetails,
        StageId::GenerateQuestions,
        StageId::AnswerQuestions,
        StageId::ScoreResults,
    ];

    /// 1-based stage number.
    pub fn number(self) -> usize {
        match self {
            StageId::GatherDetails => 1,
            StageId::GenerateQuestions => 2,
            StageId::AnswerQuestions => 3,
            StageId::ScoreResults => 4,
        }
    }

    /// Stage for a 1-based number, if in range.
    pub fn from_number(n: usize) -> Option<StageId> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// The stage that runs after this one.
    pub fn next(self) -> Option<StageId> {
        Self::from_number(self.number() + 1)
    }

    /// Key used in the stage configuration map.
    pub fn config_key(self) -> &'static str {
        match self {
            StageId::GatherDetails => "stage_1_gather_details",
            StageId::GenerateQuestions => "stage_2_generate_questions",
            StageId::AnswerQuestions => "stage_3_answer_questions",
            StageId::ScoreResults => "stage_4_score_results",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            StageId::GatherDetails => "Gather Details",
            StageId::GenerateQuestions => "Generate Questions",
            StageId::AnswerQuestions => "Answer Questions",
            StageId::ScoreResults => "Score Results",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.label())
    }
}

/// Terminal status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Success,
    Failed,
}

/// Recorded failure detail: classification plus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AuditError> for StageError {
    fn from(err: &AuditError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of running one stage. Immutable once built.
///
/// The constructors uphold the invariants: a payload is present iff the
/// stage succeeded, and an error is present iff it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    stage: StageId,
    status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<StagePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_used: Option<ModelBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<StageError>,
    attempts: u32,
    started_at: DateTime<Utc>,
    elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<ConfidenceBreakdown>,
    /// The unparsed reply, kept only when it violated the stage schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw_response: Option<String>,
}

impl StageResult {
    /// A successful stage.
    pub fn success(
        stage: StageId,
        payload: StagePayload,
        model_used: ModelBinding,
        attempts: u32,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let confidence = payload.confidence();
        Self {
            stage,
            status: StageStatus::Success,
            payload: Some(payload),
            model_used: Some(model_used),
            error: None,
            attempts,
            started_at,
            elapsed_ms,
            confidence,
            raw_response: None,
        }
    }

    /// A failed stage. `model_used` is `None` only when resolution itself failed.
    pub fn failed(
        stage: StageId,
        model_used: Option<ModelBinding>,
        error: &AuditError,
        attempts: u32,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            payload: None,
            model_used,
            error: Some(StageError::from(error)),
            attempts,
            started_at,
            elapsed_ms,
            confidence: None,
            raw_response: None,
        }
    }

    /// A stage whose reply arrived but did not parse. The reply text is
    /// kept so the report can still be inspected.
    pub fn failed_with_raw(
        stage: StageId,
        model_used: ModelBinding,
        error: &AuditError,
        raw_response: impl Into<String>,
        attempts: u32,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            raw_response: Some(raw_response.into()),
            ..Self::failed(stage, Some(model_used), error, attempts, started_at, elapsed_ms)
        }
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }

    pub fn payload(&self) -> Option<&StagePayload> {
        self.payload.as_ref()
    }

    pub fn model_used(&self) -> Option<&ModelBinding> {
        self.model_used.as_ref()
    }

    pub fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }

    /// Number of provider calls issued (0 when the stage failed before calling).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Answer confidence distribution (answer stage only).
    pub fn confidence(&self) -> Option<&ConfidenceBreakdown> {
        self.confidence.as_ref()
    }

    /// Reply text that failed to parse, if any.
    pub fn raw_response(&self) -> Option<&str> {
        self.raw_response.as_deref()
    }
}
