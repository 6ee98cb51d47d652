//! Kubernetes resources parsed from manifest files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Name used when a document has no `metadata.name`.
pub const UNNAMED: &str = "unnamed";

/// One Kubernetes object declaration extracted from a manifest.
///
/// `body` is the document exactly as parsed. It is never edited in place; a
/// fix is expressed as a new body on the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: String,
    pub api_version: String,
    pub name: String,
    /// `None` for cluster-scoped objects or the default namespace.
    pub namespace: Option<String>,
    pub source_file: PathBuf,
    pub body: Value,
}

impl Resource {
    /// Build a resource from a parsed YAML document.
    ///
    /// Returns `None` unless the document is a mapping with non-empty string
    /// `kind` and `apiVersion` fields (Kustomize patches and other fragments
    /// are not resources).
    pub fn from_document(body: Value, source_file: &Path) -> Option<Self> {
        let kind = non_empty_str(body.get("kind"))?.to_string();
        let api_version = non_empty_str(body.get("apiVersion"))?.to_string();

        let metadata = body.get("metadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(scalar_to_string)
            .unwrap_or_else(|| UNNAMED.to_string());
        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(scalar_to_string);

        Some(Self {
            kind,
            api_version,
            name,
            namespace,
            source_file: source_file.to_path_buf(),
            body,
        })
    }

    /// Copy of the body with `apiVersion` replaced, keeping key order.
    pub fn body_with_api_version(&self, api_version: &str) -> Value {
        let mut body = self.body.clone();
        if let Value::Mapping(map) = &mut body {
            map.insert(
                Value::String("apiVersion".to_string()),
                Value::String(api_version.to_string()),
            );
        }
        body
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} '{}/{}'", self.kind, self.api_version, ns, self.name),
            None => write!(f, "{}/{} '{}'", self.kind, self.api_version, self.name),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
