//! Tolerant parsing of vision-model answers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{DocKind, ExtractedFields};

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("think pattern compiles"));

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fence pattern compiles")
});

static KIND_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(t4|receipt|invoice|id|identification|licen[cs]e|passport|unknown)\b")
        .expect("kind pattern compiles")
});

fn strip_reasoning(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Map a free-text classification answer to a kind.
///
/// The first recognised token wins; answers with none are `None`.
pub fn parse_kind(text: &str) -> Option<DocKind> {
    let cleaned = strip_reasoning(text);
    let token = KIND_TOKEN.captures(&cleaned)?.get(1)?.as_str().to_ascii_lowercase();
    let kind = match token.as_str() {
        "t4" => DocKind::T4,
        "receipt" | "invoice" => DocKind::Receipt,
        "id" | "identification" | "license" | "licence" | "passport" => DocKind::Id,
        _ => DocKind::Unknown,
    };
    Some(kind)
}

/// Pull the JSON object out of an extraction answer (fenced or bare).
pub fn parse_fields(text: &str) -> Result<ExtractedFields, String> {
    let cleaned = strip_reasoning(text);

    let candidate = match FENCED_JSON.captures(&cleaned).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => {
            let start = cleaned.find('{').ok_or("no JSON object in response")?;
            let end = cleaned.rfind('}').ok_or("unterminated JSON object in response")?;
            if end < start {
                return Err("unterminated JSON object in response".into());
            }
            cleaned[start..=end].to_string()
        }
    };

    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("response JSON is not an object".into()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}
