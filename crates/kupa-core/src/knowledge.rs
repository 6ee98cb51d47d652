//! Static knowledge base of removed Kubernetes API versions.
//!
//! The last-resort source: consulted only when every oracle declined. A rule
//! fires when the target version is at or past the release that removed the
//! API.

use std::sync::Arc;

use kupa_domain::{BreakingChange, ChangeKind, KubeVersion, Resource};

/// One removed `(kind, apiVersion)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticRule {
    pub kind: &'static str,
    pub api_version: &'static str,
    pub removed_in: &'static str,
    /// `None` when the API family was dropped without a successor.
    pub replacement: Option<&'static str>,
    pub description: &'static str,
}

impl StaticRule {
    /// Whether a cluster at `target` no longer serves this API.
    pub fn fires(&self, target: &KubeVersion) -> bool {
        KubeVersion::parse(self.removed_in)
            .map(|removed_in| *target >= removed_in)
            .unwrap_or(false)
    }

    pub fn recommended_action(&self) -> String {
        match self.replacement {
            Some(replacement) => format!("Update apiVersion to {replacement}"),
            None => format!(
                "Remove this {} and migrate to its successor mechanism",
                self.kind
            ),
        }
    }

    /// Verdict for a resource this rule matched.
    ///
    /// Without a replacement the body is left as is; only the report tells
    /// the operator what to do.
    pub fn verdict(&self, resource: Arc<Resource>) -> BreakingChange {
        let fixed_body = match self.replacement {
            Some(replacement) => resource.body_with_api_version(replacement),
            None => resource.body.clone(),
        };
        BreakingChange {
            change_kind: ChangeKind::ApiRemoved,
            description: self.description.to_string(),
            recommended_action: self.recommended_action(),
            fixed_body,
            resource,
        }
    }
}

macro_rules! rule {
    ($kind:literal, $api:literal, $removed:literal, $replacement:expr, $description:literal) => {
        StaticRule {
            kind: $kind,
            api_version: $api,
            removed_in: $removed,
            replacement: $replacement,
            description: $description,
        }
    };
}

/// Every known removal.
#[rustfmt::skip]
pub static RULES: &[StaticRule] = &[
    rule!("Deployment", "apps/v1beta1", "v1.16.0", Some("apps/v1"),
        "apps/v1beta1 was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("Deployment", "apps/v1beta2", "v1.16.0", Some("apps/v1"),
        "apps/v1beta2 was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("Deployment", "extensions/v1beta1", "v1.16.0", Some("apps/v1"),
        "extensions/v1beta1 for Deployments was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("StatefulSet", "apps/v1beta1", "v1.16.0", Some("apps/v1"),
        "apps/v1beta1 was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("StatefulSet", "apps/v1beta2", "v1.16.0", Some("apps/v1"),
        "apps/v1beta2 was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("DaemonSet", "apps/v1beta2", "v1.16.0", Some("apps/v1"),
        "apps/v1beta2 was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("DaemonSet", "extensions/v1beta1", "v1.16.0", Some("apps/v1"),
        "extensions/v1beta1 for DaemonSets was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("ReplicaSet", "apps/v1beta2", "v1.16.0", Some("apps/v1"),
        "apps/v1beta2 was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("ReplicaSet", "extensions/v1beta1", "v1.16.0", Some("apps/v1"),
        "extensions/v1beta1 for ReplicaSets was removed in Kubernetes v1.16. Use apps/v1 instead."),
    rule!("Ingress", "extensions/v1beta1", "v1.22.0", Some("networking.k8s.io/v1"),
        "extensions/v1beta1 was removed in Kubernetes v1.22. Use networking.k8s.io/v1 instead."),
    rule!("Ingress", "networking.k8s.io/v1beta1", "v1.22.0", Some("networking.k8s.io/v1"),
        "networking.k8s.io/v1beta1 was removed in Kubernetes v1.22. Use networking.k8s.io/v1 instead."),
    rule!("NetworkPolicy", "extensions/v1beta1", "v1.16.0", Some("networking.k8s.io/v1"),
        "extensions/v1beta1 for NetworkPolicies was removed in Kubernetes v1.16. Use networking.k8s.io/v1 instead."),
    rule!("PodSecurityPolicy", "extensions/v1beta1", "v1.21.0", Some("policy/v1beta1"),
        "extensions/v1beta1 for PodSecurityPolicies was removed in Kubernetes v1.21. Use policy/v1beta1 instead."),
    rule!("PodSecurityPolicy", "policy/v1beta1", "v1.25.0", None,
        "PodSecurityPolicy was entirely removed in Kubernetes v1.25. Use Pod Security Standards and Admission instead."),
    rule!("CustomResourceDefinition", "apiextensions.k8s.io/v1beta1", "v1.22.0", Some("apiextensions.k8s.io/v1"),
        "apiextensions.k8s.io/v1beta1 was removed in Kubernetes v1.22. Use apiextensions.k8s.io/v1 instead."),
];

/// Rule for an exact `(kind, apiVersion)` pair.
pub fn lookup(kind: &str, api_version: &str) -> Option<&'static StaticRule> {
    RULES
        .iter()
        .find(|rule| rule.kind == kind && rule.api_version == api_version)
}

/// Verdict for `resource` at `target`, if a rule fires.
pub fn check(resource: &Arc<Resource>, target: &KubeVersion) -> Option<BreakingChange> {
    lookup(&resource.kind, &resource.api_version)
        .filter(|rule| rule.fires(target))
        .map(|rule| rule.verdict(Arc::clone(resource)))
}
