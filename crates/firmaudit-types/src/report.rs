//! Pipeline report, run outcome and run summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::binding::ModelBinding;
use crate::stage::{StageError, StageId, StageResult, StageStatus};

/// Why a run stopped before (or instead of) running its stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// No provider in the registry is enabled; nothing was executed.
    NoProvidersAvailable,
    /// The caller cancelled the run (e.g. Ctrl-C).
    Interrupted,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoProvidersAvailable => {
                f.write_str("no models could be initialized: no enabled providers")
            }
            AbortReason::Interrupted => f.write_str("run interrupted"),
        }
    }
}

/// Terminal status of a pipeline run, reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed,
    StageFailed { stage: StageId, error: StageError },
    Aborted { reason: AbortReason },
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed)
    }

    /// Process exit code: 0 completed, 1 stage failed, 2 aborted.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineOutcome::Completed => 0,
            PipelineOutcome::StageFailed { .. } => 1,
            PipelineOutcome::Aborted { .. } => 2,
        }
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineOutcome::Completed => f.write_str("completed"),
            PipelineOutcome::StageFailed { stage, error } => {
                write!(f, "{stage} failed: {error}")
            }
            PipelineOutcome::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

/// A stage result that could not be appended to the report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected a result for {expected}, got {got}")]
    OutOfOrder { expected: StageId, got: StageId },

    #[error("{failed} failed; later stages cannot be recorded")]
    AfterFailure { failed: StageId },

    #[error("all stages already recorded")]
    Full,

    #[error("report is already finalized")]
    Finalized,
}

/// Per-stage binding line of the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBindingSummary {
    pub stage: StageId,
    /// Raw configuration string (`provider` or `provider:model`).
    pub configured: String,
    /// Binding actually used, when the stage got far enough to resolve.
    pub binding: Option<ModelBinding>,
    /// `None` when the stage never ran.
    pub status: Option<StageStatus>,
}

/// Human-inspectable run summary consumed by reporting front ends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub provider_count: usize,
    pub providers_available: Vec<String>,
    pub stages: Vec<StageBindingSummary>,
}

/// Ordered record of a pipeline run.
///
/// Entry `k` only exists if entry `k - 1` succeeded. [`record`](Self::record)
/// is the only way to add entries and appends a whole [`StageResult`] or
/// nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    run_id: Uuid,
    company: String,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
    stages: Vec<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outcome: Option<PipelineOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
}

impl PipelineReport {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            company: company.into(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::with_capacity(StageId::ALL.len()),
            outcome: None,
            summary: None,
        }
    }

    /// The stage whose result is expected next, if any.
    pub fn next_stage(&self) -> Option<StageId> {
        match self.stages.last() {
            None => Some(StageId::GatherDetails),
            Some(last) if last.is_success() => last.stage().next(),
            Some(_) => None,
        }
    }

    /// Append a stage result.
    pub fn record(&mut self, result: StageResult) -> Result<(), RecordError> {
        if self.outcome.is_some() {
            return Err(RecordError::Finalized);
        }
        if let Some(last) = self.stages.last()
            && !last.is_success()
        {
            return Err(RecordError::AfterFailure {
                failed: last.stage(),
            });
        }
        let expected = self.next_stage().ok_or(RecordError::Full)?;
        if result.stage() != expected {
            return Err(RecordError::OutOfOrder {
                expected,
                got: result.stage(),
            });
        }
        self.stages.push(result);
        Ok(())
    }

    /// Seal the report with its outcome and summary.
    pub fn finalize(&mut self, outcome: PipelineOutcome, summary: RunSummary) {
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
        self.summary = Some(summary);
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    pub fn get(&self, stage: StageId) -> Option<&StageResult> {
        self.stages.get(stage.number() - 1)
    }

    pub fn outcome(&self) -> Option<&PipelineOutcome> {
        self.outcome.as_ref()
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Wall-clock duration, once finalized.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
