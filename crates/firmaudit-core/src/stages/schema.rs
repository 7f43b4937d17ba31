//! Reply parsers for the built-in stages.
//!
//! All failures are [`AuditError::SchemaViolation`]; the executor never
//! retries them.

use std::collections::BTreeMap;

use firmaudit_types::{AnswerSet, AuditError, CompanyProfile, QuestionSet, ScoreCard};
use serde_json::Value;

use crate::json_repair::extract_json;

/// Stage 1 replies are prose; anything non-blank is accepted.
pub fn parse_profile(raw: &str) -> Result<CompanyProfile, AuditError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AuditError::schema("company profile is empty"));
    }
    Ok(CompanyProfile::new(text))
}

/// Stage 2: an object whose array values are per-stakeholder questions.
///
/// Keys lose a trailing `_questions`. Items may be strings or objects with
/// a `question` field; other array items are ignored.
pub fn parse_questions(raw: &str) -> Result<QuestionSet, AuditError> {
    let value = json_object(raw, "question set")?;
    let Value::Object(map) = value else {
        return Err(AuditError::schema("question set is not a JSON object"));
    };

    let mut categories = BTreeMap::new();
    for (key, val) in map {
        let Value::Array(items) = val else { continue };
        let questions: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim()),
                Value::Object(o) => o.get("question").and_then(Value::as_str).map(str::trim),
                _ => None,
            })
            .filter(|q| !q.is_empty())
            .map(String::from)
            .collect();
        let stakeholder = key.strip_suffix("_questions").unwrap_or(&key).to_string();
        categories.insert(stakeholder, questions);
    }

    let set = QuestionSet { categories };
    if set.total() == 0 {
        return Err(AuditError::schema("question set contains no questions"));
    }
    Ok(set)
}

/// Stage 3: `{"responses": [...]}`, or a bare array of responses.
pub fn parse_answers(raw: &str) -> Result<AnswerSet, AuditError> {
    let value = match json_object(raw, "answer set")? {
        arr @ Value::Array(_) => serde_json::json!({ "responses": arr }),
        other => other,
    };
    let set: AnswerSet = serde_json::from_value(value)
        .map_err(|e| AuditError::schema(format!("answer set: {e}")))?;
    if set.responses.is_empty() {
        return Err(AuditError::schema("answer set contains no responses"));
    }
    Ok(set)
}

/// Stage 4: `evaluation_results` plus an optional `overall_summary`.
pub fn parse_scores(raw: &str) -> Result<ScoreCard, AuditError> {
    let value = json_object(raw, "score card")?;
    let card: ScoreCard = serde_json::from_value(value)
        .map_err(|e| AuditError::schema(format!("score card: {e}")))?;
    if card.evaluation_results.is_empty() {
        return Err(AuditError::schema("score card contains no evaluations"));
    }
    Ok(card)
}

fn json_object(raw: &str, what: &str) -> Result<Value, AuditError> {
    extract_json(raw).map_err(|e| AuditError::schema(format!("{what} is not valid JSON: {e}")))
}
