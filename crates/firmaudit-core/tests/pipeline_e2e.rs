//! End-to-end orchestration with stubbed model clients.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use firmaudit_core::orchestrator::PipelineRun;
use firmaudit_core::sink::SinkError;
use firmaudit_core::{
    ClientBuilder, ClientFactory, JsonFileSink, Orchestrator, PipelineState, ProviderRegistry,
    ReportSink, StageExecutor, StaticCredentials,
};
use firmaudit_llm::{ChatMessage, ChatRequest, ChatResponse, Choice, Provider, ProviderError, RetryPolicy};
use firmaudit_types::{
    AbortReason, AuditError, ErrorKind, ModelBinding, PipelineOutcome, PipelineReport,
    ProviderSpec, SecretString, StageId, StageModels, StagePayload, StageStatus,
    builtin_providers,
};
use tokio_util::sync::CancellationToken;

const PROFILE: &str = "Acme builds rockets. Competitors: Globex. Strengths: price.";

const QUESTIONS: &str = r#"```json
{
  "customer_questions": ["Is Acme reliable?", "How much does it cost?"],
  "investor_questions": ["Is Acme profitable?"]
}
```"#;

const ANSWERS: &str = r#"{"responses": [
  {"stakeholder": "customer", "question": "Is Acme reliable?", "answer": "Mostly.",
   "confidence": "High", "risk_flag": "None", "sentiment": "Positive", "reasoning_summary": "track record"},
  {"stakeholder": "customer", "question": "How much does it cost?", "answer": "It varies.",
   "confidence": "medium", "risk_flag": "None", "sentiment": "Neutral", "reasoning_summary": "pricing"},
  {"stakeholder": "investor", "question": "Is Acme profitable?", "answer": "Unclear.",
   "confidence": "Low", "risk_flag": "Financial", "sentiment": "Negative", "reasoning_summary": "no filings"}
]}"#;

const SCORES: &str = r#"Here is the audit:
{"evaluation_results": [
  {"stakeholder": "investor", "question": "Is Acme profitable?",
   "scores": {"logical_consistency": 7, "completeness": "6", "clarity": "8/10"},
   "hallucination_risk": "Medium", "bias_level": "Low", "sentiment_alignment": "Aligned",
   "risk_exposure": "High", "overconfidence_flag": false, "speculation_flag": "true", "notes": ""}
],
"overall_summary": {"average_logical_score": 7, "average_completeness_score": 6,
  "average_clarity_score": 8, "dominant_sentiment_trend": "Mixed",
  "overall_company_risk_signal": "Moderate", "model_behavior_observations": "ok"}}"#;

/// Which stage a prompt belongs to, judged by its opening text.
fn stage_of(prompt: &str) -> StageId {
    if prompt.contains("independent AI auditor") {
        StageId::ScoreResults
    } else if prompt.contains("seasoned business analyst") {
        StageId::AnswerQuestions
    } else if prompt.contains("simulating real human curiosity") {
        StageId::GenerateQuestions
    } else {
        StageId::GatherDetails
    }
}

#[derive(Debug, Clone)]
struct Call {
    binding: String,
    stage: StageId,
    prompt: String,
}

#[derive(Clone, Default)]
struct Script {
    calls: Arc<Mutex<Vec<Call>>>,
    builds: Arc<Mutex<Vec<String>>>,
    replies: HashMap<StageId, String>,
    /// Providers whose calls fail with an auth rejection.
    rejecting: Vec<String>,
    delay: Option<Duration>,
}

impl Script {
    fn happy() -> Self {
        let replies = HashMap::from([
            (StageId::GatherDetails, PROFILE.to_string()),
            (StageId::GenerateQuestions, QUESTIONS.to_string()),
            (StageId::AnswerQuestions, ANSWERS.to_string()),
            (StageId::ScoreResults, SCORES.to_string()),
        ]);
        Self {
            replies,
            ..Self::default()
        }
    }

    fn reply(mut self, stage: StageId, text: &str) -> Self {
        self.replies.insert(stage, text.to_string());
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn builds(&self) -> Vec<String> {
        self.builds.lock().unwrap().clone()
    }
}

struct StubProvider {
    binding: String,
    provider: String,
    script: Script,
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &ChatRequest) -> firmaudit_llm::Result<ChatResponse> {
        let prompt = request.messages[0].content.clone();
        let stage = stage_of(&prompt);
        self.script.calls.lock().unwrap().push(Call {
            binding: self.binding.clone(),
            stage,
            prompt,
        });
        if let Some(delay) = self.script.delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.rejecting.contains(&self.provider) {
            return Err(ProviderError::AuthFailed("invalid api key".into()));
        }
        let text = self.script.replies.get(&stage).cloned().unwrap_or_default();
        Ok(ChatResponse {
            id: "stub".into(),
            model: request.model.clone(),
            usage: None,
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: Some("stop".into()),
            }],
        })
    }
}

impl ClientBuilder for Script {
    fn build(
        &self,
        spec: &ProviderSpec,
        binding: &ModelBinding,
        _api_key: SecretString,
    ) -> Result<Arc<dyn Provider>, AuditError> {
        self.builds.lock().unwrap().push(binding.to_string());
        Ok(Arc::new(StubProvider {
            binding: binding.to_string(),
            provider: spec.name.clone(),
            script: self.clone(),
        }))
    }
}

#[derive(Default)]
struct RecordingSink {
    outcomes: Mutex<Vec<PipelineOutcome>>,
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn persist(&self, report: &PipelineReport) -> Result<Option<PathBuf>, SinkError> {
        let outcome = report.outcome().cloned().expect("report is finalized before persisting");
        self.outcomes.lock().unwrap().push(outcome);
        Ok(None)
    }
}

struct BrokenSink;

#[async_trait]
impl ReportSink for BrokenSink {
    async fn persist(&self, _report: &PipelineReport) -> Result<Option<PathBuf>, SinkError> {
        Err(SinkError::Io {
            path: PathBuf::from("/nowhere"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

fn all_keys() -> StaticCredentials {
    StaticCredentials::new()
        .with("gemini", "g-key")
        .with("groq", "q-key")
        .with("cohere", "c-key")
}

struct Harness {
    orchestrator: Orchestrator,
    factory: Arc<ClientFactory>,
    sink: Arc<RecordingSink>,
}

fn harness(
    providers: Vec<ProviderSpec>,
    stages: StageModels,
    credentials: StaticCredentials,
    script: &Script,
) -> Harness {
    let registry = Arc::new(ProviderRegistry::from_specs(providers).unwrap());
    let factory = Arc::new(ClientFactory::new(
        Arc::clone(&registry),
        Arc::new(script.clone()),
    ));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(
        registry,
        stages,
        Arc::clone(&factory),
        Arc::new(credentials),
        StageExecutor::new(RetryPolicy::none(), Duration::from_secs(5)),
    )
    .with_sink(sink.clone());
    Harness {
        orchestrator,
        factory,
        sink,
    }
}

fn default_harness(script: &Script) -> Harness {
    harness(builtin_providers(), StageModels::default(), all_keys(), script)
}

fn bindings_used(run: &PipelineRun) -> Vec<String> {
    run.report
        .stages()
        .iter()
        .map(|r| r.model_used().map(|b| b.to_string()).unwrap_or_default())
        .collect()
}

fn failure_kind(run: &PipelineRun) -> Option<(StageId, ErrorKind)> {
    match &run.outcome {
        PipelineOutcome::StageFailed { stage, error } => Some((*stage, error.kind)),
        _ => None,
    }
}

#[tokio::test]
async fn default_configuration_completes_all_stages() {
    let script = Script::happy();
    let h = default_harness(&script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(run.outcome, PipelineOutcome::Completed);
    assert_eq!(run.outcome.exit_code(), 0);
    assert_eq!(run.final_state(), Some(PipelineState::Completed));
    assert_eq!(run.report.stages().len(), 4);
    assert!(run.report.stages().iter().all(|r| r.status() == StageStatus::Success));
    assert_eq!(
        bindings_used(&run),
        vec![
            "gemini:gemini-3-flash-preview",
            "groq:llama-3.3-70b-versatile",
            "groq:openai/gpt-oss-120b",
            "cohere:command-a-03-2025",
        ]
    );

    let calls = script.calls();
    let stages: Vec<StageId> = calls.iter().map(|c| c.stage).collect();
    assert_eq!(stages, StageId::ALL.to_vec());
    assert!(calls[0].prompt.contains("Acme"));
    assert!(calls[1].prompt.contains(PROFILE));
    assert!(calls[2].prompt.contains("Is Acme profitable?"));
    assert!(calls[3].prompt.contains("Unclear."));

    let Some(StagePayload::Scores(card)) = run.report.get(StageId::ScoreResults).and_then(|r| r.payload()) else {
        panic!("stage 4 should carry a score card");
    };
    assert_eq!(card.flagged_items().len(), 1);
    assert_eq!(card.evaluation_results[0].scores.clarity, 8.0);

    let confidence = run.report.get(StageId::AnswerQuestions).and_then(|r| r.confidence()).unwrap();
    assert_eq!((confidence.high, confidence.medium, confidence.low), (1, 1, 1));

    let summary = run.report.summary().unwrap();
    assert_eq!(summary.provider_count, 3);
    assert_eq!(summary.providers_available, vec!["cohere", "gemini", "groq"]);
    assert!(summary.stages.iter().all(|s| s.status == Some(StageStatus::Success)));

    assert_eq!(h.factory.constructed(), 4);
    assert_eq!(*h.sink.outcomes.lock().unwrap(), vec![PipelineOutcome::Completed]);
}

#[tokio::test]
async fn missing_groq_key_stops_at_stage_two() {
    let script = Script::happy();
    let creds = StaticCredentials::new().with("gemini", "g").with("cohere", "c");
    let h = harness(builtin_providers(), StageModels::default(), creds, &script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(
        failure_kind(&run),
        Some((StageId::GenerateQuestions, ErrorKind::MissingCredential))
    );
    assert_eq!(run.outcome.exit_code(), 1);
    assert_eq!(
        run.final_state(),
        Some(PipelineState::StageFailed(StageId::GenerateQuestions))
    );

    let stages = run.report.stages();
    assert_eq!(stages.len(), 2);
    assert!(stages[0].is_success());
    assert_eq!(stages[1].status(), StageStatus::Failed);
    assert_eq!(stages[1].attempts(), 0);
    assert!(stages[1].error().unwrap().message.contains("groq"));
    assert!(run.report.get(StageId::AnswerQuestions).is_none());
    assert!(run.report.get(StageId::ScoreResults).is_none());

    // Only stage 1 ever reached a model.
    let calls = script.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].binding, "gemini:gemini-3-flash-preview");
    assert_eq!(h.sink.outcomes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn no_enabled_providers_aborts_before_any_call() {
    let script = Script::happy();
    let providers = builtin_providers()
        .into_iter()
        .map(|p| p.enabled(false))
        .collect();
    let h = harness(providers, StageModels::default(), all_keys(), &script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(
        run.outcome,
        PipelineOutcome::Aborted {
            reason: AbortReason::NoProvidersAvailable
        }
    );
    assert_eq!(run.outcome.exit_code(), 2);
    assert!(run.report.stages().is_empty());
    assert!(script.calls().is_empty());
    assert!(script.builds().is_empty());
    assert_eq!(
        run.states,
        vec![
            PipelineState::Pending(StageId::GatherDetails),
            PipelineState::Aborted(AbortReason::NoProvidersAvailable),
        ]
    );
    assert_eq!(run.report.summary().unwrap().provider_count, 0);
    assert_eq!(h.sink.outcomes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_provider_fails_its_stage_without_a_binding() {
    let script = Script::happy();
    let stages = StageModels::new("openai", "groq", "groq", "cohere");
    let h = harness(builtin_providers(), stages, all_keys(), &script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(
        failure_kind(&run),
        Some((StageId::GatherDetails, ErrorKind::ProviderDisabled))
    );
    let first = &run.report.stages()[0];
    assert!(first.model_used().is_none());
    assert!(script.calls().is_empty());
}

#[tokio::test]
async fn unknown_provider_fails_its_stage() {
    let script = Script::happy();
    let stages = StageModels::new("gemini", "groq", "anthropic:claude", "cohere");
    let h = harness(builtin_providers(), stages, all_keys(), &script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(
        failure_kind(&run),
        Some((StageId::AnswerQuestions, ErrorKind::UnknownProvider))
    );
    assert_eq!(run.report.stages().len(), 3);
    assert_eq!(script.calls().len(), 2);
}

#[tokio::test]
async fn stages_sharing_a_binding_share_a_client() {
    let script = Script::happy();
    let stages = StageModels::new(
        "gemini",
        "groq:llama-3.3-70b-versatile",
        "groq:llama-3.3-70b-versatile",
        "cohere",
    );
    let h = harness(builtin_providers(), stages, all_keys(), &script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert!(run.outcome.is_completed());
    assert_eq!(h.factory.constructed(), 3);
    let groq_builds = script
        .builds()
        .iter()
        .filter(|b| b.starts_with("groq:"))
        .count();
    assert_eq!(groq_builds, 1);
}

#[tokio::test]
async fn malformed_scores_are_a_schema_violation() {
    let script = Script::happy().reply(StageId::ScoreResults, "I cannot produce JSON today.");
    let h = default_harness(&script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(
        failure_kind(&run),
        Some((StageId::ScoreResults, ErrorKind::SchemaViolation))
    );
    assert_eq!(run.report.stages().len(), 4);
    assert_eq!(run.report.stages().iter().filter(|r| r.is_success()).count(), 3);
    // Schema violations are not retried.
    assert_eq!(run.report.stages()[3].attempts(), 1);

    // The reply that failed to parse stays in the report.
    assert_eq!(
        run.report.stages()[3].raw_response(),
        Some("I cannot produce JSON today.")
    );
    let saved = serde_json::to_value(&run.report).unwrap();
    assert_eq!(saved["stages"][3]["raw_response"], "I cannot produce JSON today.");
    assert!(saved["stages"][2].get("raw_response").is_none());
}

#[tokio::test]
async fn rejected_setup_evicts_the_client() {
    let mut script = Script::happy();
    script.rejecting = vec!["cohere".into()];
    let h = default_harness(&script);

    let run = h.orchestrator.run("Acme", &CancellationToken::new()).await;

    assert_eq!(
        failure_kind(&run),
        Some((StageId::ScoreResults, ErrorKind::ClientInitError))
    );
    assert_eq!(h.factory.constructed(), 4);
    assert_eq!(h.factory.cached(), 3);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let script = Script::happy();
    let h = default_harness(&script);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = h.orchestrator.run("Acme", &cancel).await;

    assert_eq!(
        run.outcome,
        PipelineOutcome::Aborted {
            reason: AbortReason::Interrupted
        }
    );
    assert!(script.calls().is_empty());
    assert!(run.report.stages().is_empty());
    assert_eq!(h.sink.outcomes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancellation_mid_stage_records_nothing_for_it() {
    let mut script = Script::happy();
    script.delay = Some(Duration::from_secs(30));
    let h = default_harness(&script);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let run = tokio::time::timeout(Duration::from_secs(5), h.orchestrator.run("Acme", &cancel))
        .await
        .expect("cancellation should end the run promptly");

    assert_eq!(
        run.final_state(),
        Some(PipelineState::Aborted(AbortReason::Interrupted))
    );
    assert!(run.states.contains(&PipelineState::Running(StageId::GatherDetails)));
    assert!(run.report.stages().is_empty());
    assert_eq!(script.calls().len(), 1);
}

#[tokio::test]
async fn sink_failure_does_not_change_the_outcome() {
    let script = Script::happy();
    let registry = Arc::new(ProviderRegistry::builtin());
    let factory = Arc::new(ClientFactory::new(
        Arc::clone(&registry),
        Arc::new(script.clone()),
    ));
    let orchestrator = Orchestrator::new(
        registry,
        StageModels::default(),
        factory,
        Arc::new(all_keys()),
        StageExecutor::new(RetryPolicy::none(), Duration::from_secs(5)),
    )
    .with_sink(Arc::new(BrokenSink));

    let run = orchestrator.run("Acme", &CancellationToken::new()).await;

    assert!(run.outcome.is_completed());
    assert!(run.persisted.is_none());
    assert!(run.persist_error.unwrap().contains("read-only"));
}

#[tokio::test]
async fn json_sink_writes_failed_runs_too() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script::happy();
    let creds = StaticCredentials::new().with("gemini", "g");
    let h = harness(builtin_providers(), StageModels::default(), creds, &script);
    let orchestrator = h
        .orchestrator
        .with_sink(Arc::new(JsonFileSink::new(dir.path())));

    let run = orchestrator.run("Acme", &CancellationToken::new()).await;

    let path = run.persisted.expect("report should be written");
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(saved["company"], "Acme");
    assert_eq!(saved["outcome"]["status"], "stage_failed");
    assert_eq!(saved["stages"].as_array().unwrap().len(), 2);
}
