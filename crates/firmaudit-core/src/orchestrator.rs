//! Sequential pipeline driver.
//!
//! The orchestrator walks the four stages in order. At the start of each
//! stage it resolves that stage's configured model string, obtains a
//! client from the [`ClientFactory`], and runs the stage through the
//! [`StageExecutor`]. A failed stage ends the run; later stages never
//! start. Whatever happens, the finalized report is handed to the
//! configured [`ReportSink`].
//!
//! ```text
//! Pending(1) -> Running(1) -> Pending(2) -> ... -> Running(4) -> Completed
//!                   |
//!                   +-> StageFailed(k)
//! any Pending/Running -> Aborted(Interrupted)
//! Pending(1) with no enabled providers -> Aborted(NoProvidersAvailable)
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use firmaudit_types::{
    AbortReason, ConfigError, ErrorKind, PipelineConfig, PipelineOutcome, PipelineReport,
    StageError, StageId, StageModels, StageResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::credentials::CredentialLookup;
use crate::executor::StageExecutor;
use crate::factory::ClientFactory;
use crate::registry::ProviderRegistry;
use crate::resolver::ModelResolver;
use crate::sink::{JsonFileSink, ReportSink};
use crate::stages::{Handoff, TemplateSet};
use crate::summary::run_summary;

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending(StageId),
    Running(StageId),
    StageFailed(StageId),
    Completed,
    Aborted(AbortReason),
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::StageFailed(_) | Self::Completed | Self::Aborted(_)
        )
    }

    /// Transition out of `Running` once the stage has a result.
    fn after_stage(self, succeeded: bool) -> Self {
        match self {
            Self::Running(stage) if succeeded => {
                stage.next().map(Self::Pending).unwrap_or(Self::Completed)
            }
            Self::Running(stage) => Self::StageFailed(stage),
            other => other,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(s) => write!(f, "pending {s}"),
            Self::Running(s) => write!(f, "running {s}"),
            Self::StageFailed(s) => write!(f, "failed at {s}"),
            Self::Completed => f.write_str("completed"),
            Self::Aborted(r) => write!(f, "aborted: {r}"),
        }
    }
}

/// Everything a caller gets back from [`Orchestrator::run`].
#[derive(Debug)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub report: PipelineReport,
    /// Every state the run passed through, in order.
    pub states: Vec<PipelineState>,
    /// Where the sink stored the report, if it reported a location.
    pub persisted: Option<PathBuf>,
    /// Sink failure, if any. The outcome is unaffected.
    pub persist_error: Option<String>,
}

impl PipelineRun {
    pub fn final_state(&self) -> Option<PipelineState> {
        self.states.last().copied()
    }
}

pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    stages: StageModels,
    factory: Arc<ClientFactory>,
    credentials: Arc<dyn CredentialLookup>,
    executor: StageExecutor,
    templates: TemplateSet,
    sink: Option<Arc<dyn ReportSink>>,
}

impl Orchestrator {
    /// An orchestrator with the built-in templates and no sink.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        stages: StageModels,
        factory: Arc<ClientFactory>,
        credentials: Arc<dyn CredentialLookup>,
        executor: StageExecutor,
    ) -> Self {
        Self {
            registry,
            stages,
            factory,
            credentials,
            executor,
            templates: TemplateSet::builtin(),
            sink: None,
        }
    }

    /// Production wiring: HTTP clients and a JSON file sink in `output_dir`.
    pub fn from_config(
        config: &PipelineConfig,
        credentials: Arc<dyn CredentialLookup>,
    ) -> Result<Self, ConfigError> {
        let registry = Arc::new(ProviderRegistry::from_specs(config.providers.clone())?);
        let factory = Arc::new(ClientFactory::http(Arc::clone(&registry)));
        Ok(Self::new(
            registry,
            config.stages.clone(),
            factory,
            credentials,
            StageExecutor::from_config(config),
        )
        .with_sink(Arc::new(JsonFileSink::new(&config.output_dir))))
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Drop the sink; reports are returned but not stored.
    pub fn without_sink(mut self) -> Self {
        self.sink = None;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn factory(&self) -> &ClientFactory {
        &self.factory
    }

    pub fn stage_models(&self) -> &StageModels {
        &self.stages
    }

    /// Run the pipeline for one company.
    ///
    /// Cancellation is checked before each stage and raced against the
    /// stage in flight; an interrupted stage leaves no result behind.
    pub async fn run(&self, company: &str, cancel: &CancellationToken) -> PipelineRun {
        let mut report = PipelineReport::new(company);
        let mut handoff = Handoff::new(company);
        let mut state = PipelineState::Pending(StageId::GatherDetails);
        let mut states = vec![state];

        info!(run_id = %report.run_id(), company, "pipeline started");

        if self.registry.enabled_providers().is_empty() {
            error!("no enabled providers; nothing can run");
            state = PipelineState::Aborted(AbortReason::NoProvidersAvailable);
            states.push(state);
        }

        let mut failure = None;
        while let PipelineState::Pending(stage) = state {
            if cancel.is_cancelled() {
                state = PipelineState::Aborted(AbortReason::Interrupted);
                states.push(state);
                break;
            }

            state = PipelineState::Running(stage);
            states.push(state);
            debug!(stage = %stage, "stage started");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.run_stage(stage, &handoff) => Some(result),
            };

            let Some(result) = result else {
                warn!(stage = %stage, "interrupted while stage was running");
                state = PipelineState::Aborted(AbortReason::Interrupted);
                states.push(state);
                break;
            };

            let succeeded = result.is_success();
            if let Some(payload) = result.payload() {
                handoff.absorb(payload);
            }
            if !succeeded {
                failure = result.error().cloned();
            }
            if let Err(err) = report.record(result) {
                // Stages are driven strictly in order, so this is a logic error.
                error!(stage = %stage, error = %err, "stage result rejected by report");
            }

            state = state.after_stage(succeeded);
            states.push(state);
        }

        let outcome = match state {
            PipelineState::Completed => PipelineOutcome::Completed,
            PipelineState::StageFailed(stage) => PipelineOutcome::StageFailed {
                stage,
                error: failure.unwrap_or_else(|| StageError {
                    kind: ErrorKind::ProviderError,
                    message: "stage failed without an error record".into(),
                }),
            },
            PipelineState::Aborted(reason) => PipelineOutcome::Aborted { reason },
            PipelineState::Pending(_) | PipelineState::Running(_) => {
                PipelineOutcome::Aborted {
                    reason: AbortReason::Interrupted,
                }
            }
        };

        report.finalize(
            outcome.clone(),
            run_summary(&self.registry, &self.stages, &report),
        );
        info!(
            run_id = %report.run_id(),
            outcome = %outcome,
            elapsed_ms = report.elapsed_ms().unwrap_or_default(),
            "pipeline finished"
        );

        let (persisted, persist_error) = self.persist(&report).await;

        PipelineRun {
            outcome,
            report,
            states,
            persisted,
            persist_error,
        }
    }

    /// Resolve, obtain a client, execute. Failures before the call have
    /// zero attempts.
    async fn run_stage(&self, stage: StageId, handoff: &Handoff) -> StageResult {
        let started_at = Utc::now();
        let raw = self.stages.get(stage);

        let binding = match ModelResolver::new(&self.registry).resolve(stage, raw) {
            Ok(binding) => binding,
            Err(err) => {
                warn!(stage = %stage, spec = raw, error = %err, "model resolution failed");
                return StageResult::failed(stage, None, &err, 0, started_at, 0);
            }
        };

        let client = match self.factory.get_client(&binding, self.credentials.as_ref()) {
            Ok(client) => client,
            Err(err) => {
                warn!(stage = %stage, binding = %binding, error = %err, "client unavailable");
                return StageResult::failed(stage, Some(binding), &err, 0, started_at, 0);
            }
        };

        let result = self
            .executor
            .run(self.templates.get(stage), &client, handoff)
            .await;

        // A platform that rejected the setup should not be reused.
        if result
            .error()
            .is_some_and(|e| e.kind == ErrorKind::ClientInitError)
        {
            self.factory.evict(&binding);
        }
        result
    }

    async fn persist(&self, report: &PipelineReport) -> (Option<PathBuf>, Option<String>) {
        let Some(sink) = &self.sink else {
            return (None, None);
        };
        match sink.persist(report).await {
            Ok(path) => (path, None),
            Err(err) => {
                error!(error = %err, "failed to persist report");
                (None, Some(err.to_string()))
            }
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stages)
            .field("providers", &self.registry.names())
            .field("executor", &self.executor)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
