//! The four company audit stages.

use firmaudit_types::{AuditError, StageId, StagePayload};

use super::{Handoff, StageTemplate, prompts, schema};

/// Stage 1: free-form company overview.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatherDetails;

/// Stage 2: stakeholder questions about the overview.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateQuestions;

/// Stage 3: answers with confidence, risk and sentiment tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerQuestions;

/// Stage 4: audit scores over the answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreResults;

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AuditError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AuditError::schema(format!("failed to encode upstream payload: {e}")))
}

impl StageTemplate for GatherDetails {
    fn stage(&self) -> StageId {
        StageId::GatherDetails
    }

    fn render(&self, handoff: &Handoff) -> Result<String, AuditError> {
        Ok(prompts::gather_details(handoff.company()))
    }

    fn parse(&self, raw: &str) -> Result<StagePayload, AuditError> {
        schema::parse_profile(raw).map(StagePayload::Profile)
    }
}

impl StageTemplate for GenerateQuestions {
    fn stage(&self) -> StageId {
        StageId::GenerateQuestions
    }

    fn render(&self, handoff: &Handoff) -> Result<String, AuditError> {
        Ok(prompts::generate_questions(&handoff.profile()?.text))
    }

    fn parse(&self, raw: &str) -> Result<StagePayload, AuditError> {
        schema::parse_questions(raw).map(StagePayload::Questions)
    }
}

impl StageTemplate for AnswerQuestions {
    fn stage(&self) -> StageId {
        StageId::AnswerQuestions
    }

    fn render(&self, handoff: &Handoff) -> Result<String, AuditError> {
        // Present questions under the same keys the question prompt asked for.
        let keyed: std::collections::BTreeMap<String, &Vec<String>> = handoff
            .questions()?
            .categories
            .iter()
            .map(|(k, v)| (format!("{k}_questions"), v))
            .collect();
        Ok(prompts::answer_questions(
            &handoff.profile()?.text,
            &to_json(&keyed)?,
        ))
    }

    fn parse(&self, raw: &str) -> Result<StagePayload, AuditError> {
        schema::parse_answers(raw).map(StagePayload::Answers)
    }
}

impl StageTemplate for ScoreResults {
    fn stage(&self) -> StageId {
        StageId::ScoreResults
    }

    fn render(&self, handoff: &Handoff) -> Result<String, AuditError> {
        Ok(prompts::score_results(&to_json(handoff.answers()?)?))
    }

    fn parse(&self, raw: &str) -> Result<StagePayload, AuditError> {
        schema::parse_scores(raw).map(StagePayload::Scores)
    }
}
