//! In-memory fakes for the oracle capability (testing only)
//!
//! `ScriptedOracle` answers every query with a canned response, optionally
//! after a delay, and counts how often it was consulted so tests can assert
//! query-at-most-once and short-circuit behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::oracle::Oracle;
use crate::resource::Resource;
use crate::verdict::OracleResponse;
use crate::version::KubeVersion;

// ---------------------------------------------------------------------------
// ScriptedOracle
// ---------------------------------------------------------------------------

/// Oracle returning a fixed response.
#[derive(Debug)]
pub struct ScriptedOracle {
    name: String,
    response: OracleResponse,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(name: &str, response: OracleResponse) -> Self {
        Self {
            name: name.to_string(),
            response,
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Oracle that finds nothing.
    pub fn silent(name: &str) -> Self {
        Self::new(name, OracleResponse::no_change())
    }

    /// Sleep before answering (builder pattern).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `consult` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Names of the resources consulted, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn consult(&self, resource: &Resource, _target: &KubeVersion) -> OracleResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(resource.name.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// KindOracle
// ---------------------------------------------------------------------------

/// Oracle answering per resource kind; other kinds get no change.
#[derive(Debug, Default)]
pub struct KindOracle {
    answers: Vec<(String, OracleResponse)>,
    calls: AtomicUsize,
}

impl KindOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `response` for resources of `kind` (builder pattern).
    pub fn with_answer(mut self, kind: &str, response: OracleResponse) -> Self {
        self.answers.push((kind.to_string(), response));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for KindOracle {
    fn name(&self) -> &str {
        "kind-oracle"
    }

    async fn consult(&self, resource: &Resource, _target: &KubeVersion) -> OracleResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .iter()
            .find(|(kind, _)| *kind == resource.kind)
            .map(|(_, response)| response.clone())
            .unwrap_or_else(OracleResponse::no_change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::ChangeKind;
    use std::path::Path;

    fn resource(kind: &str) -> Resource {
        let body: serde_yaml::Value = serde_yaml::from_str(&format!(
            "apiVersion: v1\nkind: {kind}\nmetadata:\n  name: sample\n"
        ))
        .unwrap();
        Resource::from_document(body, Path::new("x.yaml")).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_oracle_counts_calls() {
        let oracle = ScriptedOracle::silent("fake");
        let target = KubeVersion::parse("v1.25").unwrap();

        let first = oracle.consult(&resource("ConfigMap"), &target).await;
        let _ = oracle.consult(&resource("Secret"), &target).await;

        assert!(!first.breaking);
        assert_eq!(oracle.calls(), 2);
        assert_eq!(oracle.seen(), vec!["sample", "sample"]);
    }

    #[tokio::test]
    async fn test_kind_oracle_answers_matching_kind_only() {
        let oracle = KindOracle::new().with_answer(
            "Ingress",
            OracleResponse::breaking(ChangeKind::ApiDeprecated, "old", "update", None),
        );
        let target = KubeVersion::parse("v1.25").unwrap();

        assert!(oracle.consult(&resource("Ingress"), &target).await.breaking);
        assert!(!oracle.consult(&resource("Service"), &target).await.breaking);
        assert_eq!(oracle.calls(), 2);
    }
}
