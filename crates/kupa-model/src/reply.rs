//! Tolerant parsing of model replies.
//!
//! Models are asked for a JSON object but routinely wrap it in prose or a
//! fenced code block, quote booleans, or leave fields out. Everything here
//! works on `serde_json::Value` and takes what it can.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kupa_domain::{ChangeKind, OracleResponse};

/// Minimum self-reported confidence for a model verdict to be trusted.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Phrases in a description that mark the answer as a guess.
const HEDGE_PHRASES: &[&str] = &["i'm not sure", "i am not sure", "uncertain"];

/// The structured answer a model is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReply {
    pub has_breaking_change: bool,
    pub change_type: Option<String>,
    pub description: String,
    pub recommended_action: String,
    /// Corrected resource, as JSON.
    pub updated_content: Option<Value>,
    /// Self-reported confidence in `[0, 1]`, when the model gives one.
    pub confidence: Option<f64>,
}

impl ModelReply {
    /// Read a reply out of an arbitrary JSON value.
    ///
    /// Returns `None` if the value is not an object. Missing or oddly typed
    /// fields fall back to their defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let has_breaking_change = object
            .get("has_breaking_change")
            .map(truthy)
            .unwrap_or(false);
        let change_type = object
            .get("change_type")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let description = text_field(object.get("description"));
        let recommended_action = text_field(object.get("recommended_action"));
        let updated_content = object
            .get("updated_content")
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
            .cloned();
        let confidence = object.get("confidence").and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        Some(Self {
            has_breaking_change,
            change_type,
            description,
            recommended_action,
            updated_content,
            confidence,
        })
    }

    /// Stand-in used when a local model's text cannot be parsed at all.
    ///
    /// Flags the resource as deprecated so it lands in the report for a human
    /// to review. It carries no confidence, so the usual rule applies.
    pub fn unparseable() -> Self {
        Self {
            has_breaking_change: true,
            change_type: Some("API_DEPRECATED".to_string()),
            description: "Failed to parse model response; flagging resource for manual review"
                .to_string(),
            recommended_action: "Review this resource manually against the target version"
                .to_string(),
            updated_content: None,
            confidence: None,
        }
    }

    /// Normalize into an oracle response.
    pub fn into_response(self) -> OracleResponse {
        let confident = derive_confidence(&self);
        if !self.has_breaking_change {
            let mut response = OracleResponse::no_change();
            response.confident = confident;
            response.description = self.description;
            return response;
        }

        // A fix that does not serialize to YAML is dropped; the verdict then
        // keeps the original body.
        let fixed_body = self
            .updated_content
            .and_then(|json| serde_yaml::to_value(json).ok());

        OracleResponse {
            confident,
            breaking: true,
            change_kind: self.change_type.as_deref().map(ChangeKind::from_tag),
            description: self.description,
            recommended_action: self.recommended_action,
            fixed_body,
        }
    }
}

/// Whether a reply should be trusted.
///
/// An explicit confidence decides on its own. Without one the reply is
/// trusted unless its description hedges.
pub fn derive_confidence(reply: &ModelReply) -> bool {
    if let Some(confidence) = reply.confidence {
        return confidence > CONFIDENCE_THRESHOLD;
    }
    let description = reply.description.to_lowercase();
    !HEDGE_PHRASES
        .iter()
        .any(|phrase| description.contains(phrase))
}

/// Pull the first JSON object out of free-form model text.
///
/// Tries, in order: the whole text, the first balanced `{...}` span, the span
/// from the first `{` to the last `}`, and the body of a fenced json block.
pub fn extract_payload(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let widest = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
        _ => None,
    };
    for span in [first_object_span(trimmed), widest].into_iter().flatten() {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
            return Some(value);
        }
    }

    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").ok())
        .as_ref()?;
    fence
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(Value::is_object)
}

/// Slice from the first `{` to its matching `}`, skipping braces in strings.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
