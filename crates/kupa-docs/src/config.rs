//! Documentation source configuration.

use serde::{Deserialize, Serialize};

use kupa_domain::KubeVersion;

/// Where the documentation oracle looks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Directory holding `CHANGELOG-<version>.md` files
    pub changelog_base_url: String,
    /// Candidate changelog URLs, tried in order.
    ///
    /// Placeholders: `{base}`, `{version}` (target without `v`), `{minor}`.
    pub changelog_templates: Vec<String>,
    /// Kubernetes API reference page (HTML)
    pub api_reference_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DocsConfig {
    fn default() -> Self {
        DocsConfig {
            changelog_base_url:
                "https://raw.githubusercontent.com/kubernetes/kubernetes/master/CHANGELOG".to_string(),
            changelog_templates: vec![
                "{base}/CHANGELOG-{minor}.md".to_string(),
                "{base}/CHANGELOG-{version}.md".to_string(),
                "{base}/{version}/CHANGELOG-{version}.md".to_string(),
            ],
            api_reference_url:
                "https://kubernetes.io/docs/reference/generated/kubernetes-api/v1.28/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl DocsConfig {
    /// Expand the changelog templates for a target, dropping duplicates.
    pub fn changelog_urls(&self, target: &KubeVersion) -> Vec<String> {
        let base = self.changelog_base_url.trim_end_matches('/');
        let minor = target.minor_series();
        let mut urls: Vec<String> = Vec::with_capacity(self.changelog_templates.len());
        for template in &self.changelog_templates {
            let url = template
                .replace("{base}", base)
                .replace("{version}", target.numeric())
                .replace("{minor}", &minor);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}
