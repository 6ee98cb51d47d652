//! Verdicts and the normalized oracle response.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::resource::Resource;

/// Category of a breaking change.
///
/// The tag set is open-ended: the documentation oracle derives tags from
/// changelog buckets (`API_CHANGE`, `DEPRECATION`, ...) and a model may answer
/// with anything, so unknown tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeKind {
    ApiDeprecated,
    ApiRemoved,
    FieldRemoved,
    Other(String),
}

impl ChangeKind {
    /// Upper-snake tag, e.g. `API_REMOVED`.
    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::ApiDeprecated => "API_DEPRECATED",
            ChangeKind::ApiRemoved => "API_REMOVED",
            ChangeKind::FieldRemoved => "FIELD_REMOVED",
            ChangeKind::Other(tag) => tag,
        }
    }

    /// Normalize free-form text (`api deprecated`, `Api-Removed`) into a tag.
    pub fn from_tag(tag: &str) -> Self {
        let normalized: String = tag
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "API_DEPRECATED" => ChangeKind::ApiDeprecated,
            "API_REMOVED" => ChangeKind::ApiRemoved,
            "FIELD_REMOVED" => ChangeKind::FieldRemoved,
            "" => ChangeKind::Other("OTHER".to_string()),
            _ => ChangeKind::Other(normalized),
        }
    }
}

impl From<String> for ChangeKind {
    fn from(s: String) -> Self {
        ChangeKind::from_tag(&s)
    }
}

impl From<ChangeKind> for String {
    fn from(kind: ChangeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a knowledge source answered for one resource.
///
/// Every oracle implementation produces this shape directly, whether the
/// answer came from a hosted model, a local model, or scraped documentation.
/// `confident` only matters for model oracles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub confident: bool,
    pub breaking: bool,
    pub change_kind: Option<ChangeKind>,
    pub description: String,
    pub recommended_action: String,
    /// Replacement document; `None` means "no rewrite proposed".
    pub fixed_body: Option<Value>,
}

impl OracleResponse {
    /// The source found nothing to report.
    pub fn no_change() -> Self {
        Self {
            confident: true,
            breaking: false,
            change_kind: None,
            description: String::new(),
            recommended_action: String::new(),
            fixed_body: None,
        }
    }

    /// The source could not answer (network error, bad reply, timeout).
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            confident: false,
            breaking: false,
            change_kind: None,
            description: reason.into(),
            recommended_action: "Please check manually or try again later.".to_string(),
            fixed_body: None,
        }
    }

    /// A breaking change with a proposed fix.
    pub fn breaking(
        change_kind: ChangeKind,
        description: impl Into<String>,
        recommended_action: impl Into<String>,
        fixed_body: Option<Value>,
    ) -> Self {
        Self {
            confident: true,
            breaking: true,
            change_kind: Some(change_kind),
            description: description.into(),
            recommended_action: recommended_action.into(),
            fixed_body,
        }
    }

    /// Mark this response as not confident (builder pattern).
    pub fn uncertain(mut self) -> Self {
        self.confident = false;
        self
    }

    /// Breaking and confident: what a model gate requires to emit a verdict.
    pub fn is_actionable(&self) -> bool {
        self.breaking && self.confident
    }
}

/// The pipeline's conclusion that a resource needs a specific fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingChange {
    pub resource: Arc<Resource>,
    pub change_kind: ChangeKind,
    pub description: String,
    pub recommended_action: String,
    pub fixed_body: Value,
}

impl BreakingChange {
    /// Turn an oracle answer into a verdict.
    ///
    /// A response without a fix keeps the resource's body unchanged, and one
    /// without a tag is reported as `OTHER`.
    pub fn from_response(resource: Arc<Resource>, response: OracleResponse) -> Self {
        let fixed_body = response
            .fixed_body
            .unwrap_or_else(|| resource.body.clone());
        Self {
            change_kind: response
                .change_kind
                .unwrap_or_else(|| ChangeKind::Other("OTHER".to_string())),
            description: response.description,
            recommended_action: response.recommended_action,
            fixed_body,
            resource,
        }
    }

    /// `apiVersion` of the proposed fix, if it has one.
    pub fn fixed_api_version(&self) -> Option<&str> {
        self.fixed_body.get("apiVersion").and_then(Value::as_str)
    }
}
