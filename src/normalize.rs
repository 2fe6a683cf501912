//! Best-effort recovery of provider output.
//!
//! Generative providers wrap JSON in markdown fences, leave trailing commas
//! behind, or answer in plain prose. [`normalize`] tolerates all of these and
//! always produces a value; deciding whether that value has the expected
//! shape is left to the caller.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("comma pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedOutput {
    /// A parsed JSON object or array.
    Structured(Value),
    /// Trimmed plain text.
    Text(String),
}

impl NormalizedOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NormalizedOutput::Text(text) => Some(text),
            NormalizedOutput::Structured(_) => None,
        }
    }

    /// Renders either variant as display text; structured values become compact JSON.
    pub fn into_text(self) -> String {
        match self {
            NormalizedOutput::Text(text) => text,
            NormalizedOutput::Structured(value) => value.to_string(),
        }
    }
}

fn strip_fence(raw: &str) -> &str {
    match JSON_FENCE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

/// Removes every comma that directly precedes a closing brace or bracket.
/// Repeats until stable so runs like `[1,,]` are fully repaired.
fn repair_trailing_commas(candidate: &str) -> String {
    let mut current = candidate.to_string();
    loop {
        let repaired = TRAILING_COMMA.replace_all(&current, "$1").into_owned();
        if repaired == current {
            return current;
        }
        current = repaired;
    }
}

pub fn normalize(raw: &str) -> NormalizedOutput {
    let candidate = repair_trailing_commas(strip_fence(raw));

    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(map)) => match map.get("text") {
            Some(Value::String(text)) if !text.is_empty() => {
                NormalizedOutput::Text(text.trim().to_string())
            }
            _ => NormalizedOutput::Structured(Value::Object(map)),
        },
        Ok(value @ Value::Array(_)) => NormalizedOutput::Structured(value),
        Ok(Value::String(text)) => NormalizedOutput::Text(text.trim().to_string()),
        // Numbers, booleans and null stay as the text they came from.
        Ok(_) | Err(_) => NormalizedOutput::Text(candidate.trim().to_string()),
    }
}
