//! Structured output of each pipeline stage.
//!
//! The orchestrator treats these as opaque values it threads forward; only
//! the stage templates build them and only reporting reads into them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Parsed payload of a successful stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StagePayload {
    Profile(CompanyProfile),
    Questions(QuestionSet),
    Answers(AnswerSet),
    Scores(ScoreCard),
}

impl StagePayload {
    /// Confidence distribution, for answer payloads only.
    pub fn confidence(&self) -> Option<ConfidenceBreakdown> {
        match self {
            StagePayload::Answers(answers) => Some(answers.confidence_breakdown()),
            _ => None,
        }
    }
}

// ── Stage 1 ─────────────────────────────────────────────────────────────

/// Free-form company overview: services, competitors, positioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub text: String,
}

impl CompanyProfile {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Length of the overview in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

// ── Stage 2 ─────────────────────────────────────────────────────────────

/// Questions grouped by stakeholder (investor, customer, regulator, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionSet {
    pub categories: BTreeMap<String, Vec<String>>,
}

impl QuestionSet {
    /// Total number of questions across all stakeholders.
    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Stakeholder names in sorted order.
    pub fn stakeholders(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }
}

// ── Stage 3 ─────────────────────────────────────────────────────────────

/// Self-reported certainty of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Case-insensitive parse of "High" / "Medium" / "Low".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Confidence::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid confidence '{raw}', expected High, Medium or Low"
            ))
        })
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        };
        f.write_str(s)
    }
}

/// Count of answers per confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceBreakdown {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default)]
    pub stakeholder: String,
    pub question: String,
    pub answer: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub risk_flag: String,
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub reasoning_summary: String,
}

/// All answers produced by the answer stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnswerSet {
    pub responses: Vec<AnswerRecord>,
}

impl AnswerSet {
    pub fn confidence_breakdown(&self) -> ConfidenceBreakdown {
        let mut breakdown = ConfidenceBreakdown::default();
        for r in &self.responses {
            match r.confidence {
                Confidence::High => breakdown.high += 1,
                Confidence::Medium => breakdown.medium += 1,
                Confidence::Low => breakdown.low += 1,
            }
        }
        breakdown
    }

    /// Number of answers per stated sentiment ("Unknown" when blank).
    pub fn sentiment_distribution(&self) -> BTreeMap<String, usize> {
        let mut dist = BTreeMap::new();
        for r in &self.responses {
            let key = if r.sentiment.trim().is_empty() {
                "Unknown".to_string()
            } else {
                r.sentiment.trim().to_string()
            };
            *dist.entry(key).or_insert(0) += 1;
        }
        dist
    }
}

// ── Stage 4 ─────────────────────────────────────────────────────────────

/// Numeric 1-10 quality scores for one answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnswerScores {
    #[serde(deserialize_with = "lenient::number")]
    pub logical_consistency: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub completeness: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub clarity: f64,
}

/// Audit of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub stakeholder: String,
    #[serde(default)]
    pub question: String,
    pub scores: AnswerScores,
    #[serde(default)]
    pub hallucination_risk: String,
    #[serde(default)]
    pub bias_level: String,
    #[serde(default)]
    pub sentiment_alignment: String,
    #[serde(default)]
    pub risk_exposure: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub overconfidence_flag: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub speculation_flag: bool,
    #[serde(default)]
    pub notes: String,
}

impl Evaluation {
    /// Flagged when the auditor marked it overconfident or speculative,
    /// or rated its risk exposure High.
    pub fn is_flagged(&self) -> bool {
        self.overconfidence_flag
            || self.speculation_flag
            || self.risk_exposure.trim().eq_ignore_ascii_case("high")
    }
}

/// Aggregate view across all evaluations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallSummary {
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_logical_score: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_completeness_score: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_clarity_score: f64,
    #[serde(default)]
    pub dominant_sentiment_trend: String,
    #[serde(default)]
    pub overall_company_risk_signal: String,
    #[serde(default)]
    pub model_behavior_observations: String,
}

/// Output of the scoring stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreCard {
    pub evaluation_results: Vec<Evaluation>,
    #[serde(default)]
    pub overall_summary: OverallSummary,
}

impl ScoreCard {
    /// Evaluations that need a human look.
    pub fn flagged_items(&self) -> Vec<&Evaluation> {
        self.evaluation_results.iter().filter(|e| e.is_flagged()).collect()
    }
}

/// Models sometimes quote numbers and booleans; accept both spellings.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom("score out of range")),
            Value::String(s) => {
                // "8/10" is read as 8.
                let head = s.split('/').next().unwrap_or_default().trim();
                head.parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("expected a numeric score, got '{s}'")))
            }
            Value::Null => Ok(0.0),
            other => Err(D::Error::custom(format!(
                "expected a numeric score, got {other}"
            ))),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Bool(b) => Ok(b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(true),
                "false" | "no" | "" => Ok(false),
                _ => Err(D::Error::custom(format!("expected true/false, got '{s}'"))),
            },
            Value::Null => Ok(false),
            other => Err(D::Error::custom(format!("expected true/false, got {other}"))),
        }
    }
}
