//! Prompt text for the built-in stages.
//!
//! Templates use `{placeholder}` markers. Only the known names are
//! substituted, so JSON examples inside them need no escaping.

const GATHER_DETAILS: &str = "\
Role: you are evaluating firms for a digital transformation project. You have shortlisted {company} and need unbiased, detailed and actionable information to decide.

Prioritize clarity, specificity and decision-useful insight (differentiators, risks, industry fit). Use bullet points or concise paragraphs where helpful.

STRICT INSTRUCTION: do not include emojis or JSON in the response.

Cover each of the following:

What is {company} and what does it do?
The key services offered by {company}.
The main competitors of {company}, and how {company} compares with them.
How large {company} is as a company.
The industries {company} primarily serves.
Strengths and weaknesses of {company} and of its service.
A summary of online sentiment about {company}.
How {company} is positioned against other top competitors this year.
Why someone should choose {company}, and why they should not.
The leadership team of {company} and their roles.
Life and working environment at {company}, and employee perception.
Partners or sponsors of {company}.
Notable customers of {company}.
Awards or achievements, if any.

Provide thorough, factual and comprehensive information for each section.";

const GENERATE_QUESTIONS: &str = r#"You are simulating real human curiosity.

Based on the company profile below:

{profile}

Generate realistic questions that real people would naturally ask about this company.

Constraints:
- Questions must sound natural and conversational.
- Avoid academic, overly technical or MBA-style language.
- Do not assume access to internal financial metrics unless publicly obvious.
- Keep questions grounded in what a person could realistically know or care about.
- Limit to 5-7 strong, natural questions per stakeholder.

Stakeholders: investor, customer, competitor, regulator, journalist, potential employee, industry analyst.

Focus on practical concerns, reputation, growth, stability, trust and personal impact.

Return output strictly as JSON in this shape:
```json
{
  "investor_questions": [],
  "customer_questions": [],
  "competitor_questions": [],
  "regulator_questions": [],
  "journalist_questions": [],
  "employee_questions": [],
  "analyst_questions": []
}
```
"#;

const ANSWER_QUESTIONS: &str = r#"You are a seasoned business analyst responding to a structured interrogation about a company. Answers must be thorough, objective and professional, written in a natural human tone.

Company profile:
{profile}

Stakeholder questions:
{questions}

Answer ALL questions.

Rules:
- Base answers ONLY on the provided company profile. Do not invent facts.
- If information is missing, say "Insufficient information in provided profile." and briefly explain why that information matters.
- Mark inferences explicitly (e.g. "Based on the available data, it can be inferred that...").
- Match the tone to the question: cautious for risk, measured for growth.

For each answer include:
- "answer": detailed response
- "confidence": High / Medium / Low
- "risk_flag": None / Low / Medium / High
- "sentiment": Positive / Neutral / Negative
- "reasoning_summary": 1-2 sentences on how the answer was derived

Return output strictly as JSON in this shape:
```json
{
  "responses": [
    {
      "stakeholder": "",
      "question": "",
      "answer": "",
      "confidence": "",
      "risk_flag": "",
      "sentiment": "",
      "reasoning_summary": ""
    }
  ]
}
```
"#;

const SCORE_RESULTS: &str = r#"You are an independent AI auditor.

You are given structured question-answer data about a company. Do NOT rewrite the answers; evaluate and score them objectively.

Input:
{answers}

For EACH response evaluate:
1. Logical consistency (1-10)
2. Completeness (1-10)
3. Clarity (1-10)
4. Hallucination risk (Low / Medium / High)
5. Bias presence (None / Mild / Moderate / Strong)
6. Sentiment alignment: does the stated sentiment match the answer? (Yes / No)
7. Risk exposure (Low / Medium / High)

Also flag answers that overstate certainty, use speculative language, or contradict themselves.

Return output strictly as JSON in this shape:
```json
{
  "evaluation_results": [
    {
      "stakeholder": "",
      "question": "",
      "scores": {"logical_consistency": 0, "completeness": 0, "clarity": 0},
      "hallucination_risk": "",
      "bias_level": "",
      "sentiment_alignment": "",
      "risk_exposure": "",
      "overconfidence_flag": false,
      "speculation_flag": false,
      "notes": ""
    }
  ],
  "overall_summary": {
    "average_logical_score": 0,
    "average_completeness_score": 0,
    "average_clarity_score": 0,
    "dominant_sentiment_trend": "",
    "overall_company_risk_signal": "",
    "model_behavior_observations": ""
  }
}
```
"#;

pub fn gather_details(company: &str) -> String {
    fill(GATHER_DETAILS, &[("company", company)])
}

pub fn generate_questions(profile: &str) -> String {
    fill(GENERATE_QUESTIONS, &[("profile", profile)])
}

pub fn answer_questions(profile: &str, questions_json: &str) -> String {
    fill(
        ANSWER_QUESTIONS,
        &[("profile", profile), ("questions", questions_json)],
    )
}

pub fn score_results(answers_json: &str) -> String {
    fill(SCORE_RESULTS, &[("answers", answers_json)])
}

/// Substitute `{name}` markers in one pass over the template.
///
/// Inserted values are never rescanned, so a model reply that happens to
/// contain `{profile}` stays literal. Braces that do not form a known
/// marker are copied through.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let marker = tail.find('}').and_then(|close| {
            let name = &tail[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match marker {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_substituted_everywhere() {
        let p = gather_details("Globex");
        assert!(!p.contains("{company}"));
        assert!(p.contains("What is Globex"));
        assert!(p.contains("do not include emojis or JSON"));
    }

    #[test]
    fn question_prompt_lists_stakeholder_keys() {
        let p = generate_questions("Globex sells widgets.");
        assert!(p.contains("Globex sells widgets."));
        for key in ["investor_questions", "employee_questions", "analyst_questions"] {
            assert!(p.contains(key), "{key}");
        }
    }

    #[test]
    fn answer_prompt_placeholder_in_profile_not_expanded() {
        let p = answer_questions("profile mentions {questions} literally", "[\"q\"]");
        assert!(p.contains("profile mentions {questions} literally"));
        assert!(p.contains("[\"q\"]"));
    }

    #[test]
    fn answer_prompt_placeholder_in_questions_not_expanded() {
        let p = answer_questions("Initech makes TPS reports.", r#"["what is {profile}?"]"#);
        assert!(p.contains(r#"["what is {profile}?"]"#));
        assert_eq!(p.matches("Initech makes TPS reports.").count(), 1);
    }

    #[test]
    fn fill_leaves_json_braces_alone() {
        let out = fill(r#"{"a": {x}} {unknown} {"#, &[("x", "1")]);
        assert_eq!(out, r#"{"a": 1} {unknown} {"#);
    }

    #[test]
    fn score_prompt_embeds_answers() {
        let p = score_results("{\"responses\": []}");
        assert!(p.contains("{\"responses\": []}"));
        assert!(p.contains("overall_company_risk_signal"));
    }
}
