//! Recovering JSON from model replies.
//!
//! Models asked for "strict JSON" still wrap it in markdown fences, add a
//! sentence of preamble, leave trailing commas, forget to quote keys, or
//! stop mid-structure when they hit a token limit. [`extract_json`] tries
//! progressively more invasive strategies and returns the first value that
//! parses:
//!
//! 1. the text as-is
//! 2. with markdown fences stripped
//! 3. the outermost `{...}` span
//! 4. the outermost `[...]` span
//! 5. the fence-stripped text after [`repair_json`]
//!
//! This is not a general JSON parser; it targets the failure modes seen in
//! practice.

use serde_json::Value;

/// Parse the JSON payload out of a model reply.
///
/// Returns the error of the last attempted strategy when none succeed.
pub fn extract_json(raw: &str) -> Result<Value, serde_json::Error> {
    if let Ok(v) = serde_json::from_str(raw) {
        return Ok(v);
    }

    let stripped = strip_markdown_fences(raw);
    if let Ok(v) = serde_json::from_str(&stripped) {
        return Ok(v);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(span) = outer_span(&stripped, open, close)
            && let Ok(v) = serde_json::from_str(span)
        {
            return Ok(v);
        }
    }

    serde_json::from_str(&repair_json(&stripped))
}

/// Apply every textual repair: strip fences, drop preamble before the first
/// bracket, remove trailing commas, quote bare keys, close truncated
/// structures.
pub fn repair_json(input: &str) -> String {
    let stripped = strip_markdown_fences(input);
    let body = match stripped.find(['{', '[']) {
        Some(start) => &stripped[start..],
        None => stripped.as_str(),
    };
    let fixed = quote_bare_keys(&drop_trailing_commas(body));
    close_open_structures(&fixed)
}

/// Remove a surrounding ```` ```json ```` / ```` ``` ```` fence.
pub fn strip_markdown_fences(input: &str) -> String {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(nl) if rest[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[nl + 1..],
        _ => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim().to_string()
}

/// Slice from the first `open` to the last `close`, inclusive.
fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Tracks whether a scan position is inside a string literal.
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Feed one char; returns `true` when it belongs to a string literal
    /// (including its quotes).
    fn step(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return true;
        }
        if self.in_string {
            match c {
                '\\' => self.escaped = true,
                '"' => self.in_string = false,
                _ => {}
            }
            return true;
        }
        if c == '"' {
            self.in_string = true;
            return true;
        }
        false
    }
}

fn drop_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut state = StringState::default();

    for (i, &c) in chars.iter().enumerate() {
        if !state.step(c) && c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn quote_bare_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut state = StringState::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if state.step(c) || !(c.is_ascii_alphabetic() || c == '_') {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        let followed_by_colon = chars[i..]
            .iter()
            .find(|ch| !ch.is_whitespace())
            .is_some_and(|&ch| ch == ':');
        if followed_by_colon {
            out.push('"');
            out.push_str(&word);
            out.push('"');
        } else {
            out.push_str(&word);
        }
    }
    out
}

fn close_open_structures(input: &str) -> String {
    let mut closers = Vec::new();
    let mut state = StringState::default();

    for c in input.chars() {
        if state.step(c) {
            continue;
        }
        match c {
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' if closers.last() == Some(&c) => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut out = input.trim_end().to_string();
    if state.in_string {
        out.push('"');
    }
    // A truncated reply often stops right after a separator.
    while out.ends_with(',') || out.ends_with(':') {
        out.pop();
    }
    out.extend(closers.into_iter().rev());
    out
}
