//! Model reply parsing.
//!
//! Models are asked for a fenced JSON object but routinely wrap it in
//! prose, emit bare JSON, or ignore the format entirely. Three routes,
//! tried in order: fenced `json` block, any embedded object carrying a
//! `decision` key, then a bare keyword scan. Route failures degrade,
//! they never error; `None` means the text was unusable.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::debate::state::Decision;

static DECISION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(buy|sell|hold)\b").unwrap());

const SUMMARY_MAX_CHARS: usize = 50;

/// Structured form of one model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub decision: Decision,
    /// 0-100.
    pub confidence: u8,
    /// Short form for history rendering. May be empty.
    pub summary: String,
    /// Full argument text.
    pub reasoning: String,
}

/// Parse a raw model reply, or `None` if nothing usable was found.
pub fn parse_reply(raw: &str) -> Option<ParsedReply> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(obj) = fenced_json(trimmed) {
        trace!("reply parsed from fenced json block");
        return Some(from_object(&obj, raw));
    }
    if let Some(obj) = embedded_object(trimmed) {
        trace!("reply parsed from embedded json object");
        return Some(from_object(&obj, raw));
    }
    keyword_scan(raw)
}

/// Build a reply from a parsed object, defaulting absent keys.
fn from_object(obj: &Value, raw: &str) -> ParsedReply {
    let decision = obj
        .get("decision")
        .and_then(Value::as_str)
        .and_then(Decision::from_token)
        .unwrap_or(Decision::Hold);
    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string());
    ParsedReply {
        decision,
        confidence: confidence_from(obj.get("confidence")),
        summary,
        reasoning,
    }
}

/// Read a confidence value that may arrive as a number or a numeric
/// string (with or without a trailing `%`), clamped to 0-100.
fn confidence_from(value: Option<&Value>) -> u8 {
    let Some(value) = value else {
        return 50;
    };
    let n = if let Some(n) = value.as_f64() {
        n
    } else if let Some(s) = value.as_str() {
        s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(50.0)
    } else {
        50.0
    };
    n.round().clamp(0.0, 100.0) as u8
}

/// Contents of the first parseable ```json fence, if it holds an object.
fn fenced_json(text: &str) -> Option<Value> {
    let start = text.find("```json")?;
    let after_tag = &text[start + "```json".len()..];
    let body_start = after_tag.find('\n')? + 1;
    let body = &after_tag[body_start..];
    let end = body.find("```")?;
    let value: Value = serde_json::from_str(body[..end].trim()).ok()?;
    value.is_object().then_some(value)
}

/// First balanced `{...}` in the text that parses and carries a
/// `decision` key.
fn embedded_object(text: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(candidate) = balanced_object(&text[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                if value.get("decision").is_some() {
                    return Some(value);
                }
            }
        }
        search_from = start + 1;
    }
    None
}

/// Slice from the leading `{` through its matching `}`, tracking string
/// and escape state so braces inside values don't end the scan.
/// `text` must start with `{`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;
    for (i, c) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Last resort: first BUY/SELL/HOLD token by position.
fn keyword_scan(raw: &str) -> Option<ParsedReply> {
    let token = DECISION_TOKEN.find(raw)?;
    let decision = Decision::from_token(token.as_str())?;
    trace!(token = token.as_str(), "reply parsed from keyword scan");
    let first_line = raw.lines().next().unwrap_or_default().trim();
    Some(ParsedReply {
        decision,
        confidence: 50,
        summary: truncate_chars(first_line, SUMMARY_MAX_CHARS),
        reasoning: raw.to_string(),
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
