//! Stage prompt templates and response schemas.
//!
//! Each stage is described by a [`StageTemplate`]: how to render its prompt
//! from the [`Handoff`] of earlier outputs, and how to parse the model's
//! reply into a [`StagePayload`]. The executor and orchestrator only see
//! the trait.

mod builtin;
pub mod prompts;
pub mod schema;

use std::collections::BTreeMap;
use std::sync::Arc;

use firmaudit_types::{
    AnswerSet, AuditError, CompanyProfile, ConfigError, QuestionSet, StageId, StagePayload,
};

pub use builtin::{AnswerQuestions, GatherDetails, GenerateQuestions, ScoreResults};

/// Prompt rendering and reply parsing for one stage.
pub trait StageTemplate: Send + Sync {
    fn stage(&self) -> StageId;

    /// Build the prompt from earlier stage outputs.
    fn render(&self, handoff: &Handoff) -> Result<String, AuditError>;

    /// Parse a reply. Failures are [`AuditError::SchemaViolation`].
    fn parse(&self, raw: &str) -> Result<StagePayload, AuditError>;
}

/// Outputs of completed stages, threaded forward by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct Handoff {
    company: String,
    profile: Option<CompanyProfile>,
    questions: Option<QuestionSet>,
    answers: Option<AnswerSet>,
}

impl Handoff {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            ..Self::default()
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    /// Take in a successful stage payload.
    pub fn absorb(&mut self, payload: &StagePayload) {
        match payload {
            StagePayload::Profile(p) => self.profile = Some(p.clone()),
            StagePayload::Questions(q) => self.questions = Some(q.clone()),
            StagePayload::Answers(a) => self.answers = Some(a.clone()),
            StagePayload::Scores(_) => {}
        }
    }

    pub fn profile(&self) -> Result<&CompanyProfile, AuditError> {
        self.profile
            .as_ref()
            .ok_or_else(|| missing("company profile"))
    }

    pub fn questions(&self) -> Result<&QuestionSet, AuditError> {
        self.questions.as_ref().ok_or_else(|| missing("question set"))
    }

    pub fn answers(&self) -> Result<&AnswerSet, AuditError> {
        self.answers.as_ref().ok_or_else(|| missing("answer set"))
    }
}

fn missing(what: &str) -> AuditError {
    AuditError::schema(format!("upstream {what} is not available"))
}

/// Exactly one template per stage.
#[derive(Clone)]
pub struct TemplateSet {
    templates: BTreeMap<StageId, Arc<dyn StageTemplate>>,
}

impl TemplateSet {
    /// Fails unless every stage has exactly one template.
    pub fn new(templates: Vec<Arc<dyn StageTemplate>>) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for t in templates {
            let stage = t.stage();
            if map.insert(stage, t).is_some() {
                return Err(ConfigError::Invalid(format!("two templates for {stage}")));
            }
        }
        if let Some(missing) = StageId::ALL.iter().find(|s| !map.contains_key(*s)) {
            return Err(ConfigError::Invalid(format!("no template for {missing}")));
        }
        Ok(Self { templates: map })
    }

    /// The four built-in company audit templates.
    pub fn builtin() -> Self {
        let templates: BTreeMap<StageId, Arc<dyn StageTemplate>> = BTreeMap::from([
            (StageId::GatherDetails, Arc::new(GatherDetails) as Arc<dyn StageTemplate>),
            (StageId::GenerateQuestions, Arc::new(GenerateQuestions) as Arc<dyn StageTemplate>),
            (StageId::AnswerQuestions, Arc::new(AnswerQuestions) as Arc<dyn StageTemplate>),
            (StageId::ScoreResults, Arc::new(ScoreResults) as Arc<dyn StageTemplate>),
        ]);
        Self { templates }
    }

    /// Replace the template for its stage.
    pub fn with(mut self, template: Arc<dyn StageTemplate>) -> Self {
        self.templates.insert(template.stage(), template);
        self
    }

    pub fn get(&self, stage: StageId) -> &dyn StageTemplate {
        // `new` and `builtin` guarantee a template for every stage.
        self.templates[&stage].as_ref()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}
