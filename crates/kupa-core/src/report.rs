//! Analysis reports for humans (text) and tools (JSON).

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kupa_domain::{BreakingChange, KubeVersion};

use crate::error::{KupaError, Result};
use crate::manifest::ManifestSet;
use crate::pipeline::BatchOutcome;
use crate::writer::WrittenFile;

/// One verdict, flattened for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictEntry {
    pub file_path: String,
    pub resource_kind: String,
    pub resource_api_version: String,
    pub resource_name: String,
    pub resource_namespace: Option<String>,
    pub change_type: String,
    pub description: String,
    pub recommended_action: String,
    /// `apiVersion` of the fix, when it differs from the current one.
    pub fixed_api_version: Option<String>,
}

impl From<&BreakingChange> for VerdictEntry {
    fn from(change: &BreakingChange) -> Self {
        let resource = &change.resource;
        let fixed_api_version = change
            .fixed_api_version()
            .filter(|api| *api != resource.api_version)
            .map(str::to_string);
        Self {
            file_path: resource.source_file.display().to_string(),
            resource_kind: resource.kind.clone(),
            resource_api_version: resource.api_version.clone(),
            resource_name: resource.name.clone(),
            resource_namespace: resource.namespace.clone(),
            change_type: change.change_kind.to_string(),
            description: change.description.clone(),
            recommended_action: change.recommended_action.clone(),
            fixed_api_version,
        }
    }
}

/// Summary of one `analyze` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub target_version: String,
    pub sources: Vec<String>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub resources_found: usize,
    pub resources_analyzed: usize,
    /// Resources not analyzed because the run was cancelled.
    pub resources_skipped: usize,
    pub breaking_changes: Vec<VerdictEntry>,
    /// Empty on a dry run.
    pub file_changes: Vec<WrittenFile>,
}

impl AnalysisReport {
    pub fn new(
        target: &KubeVersion,
        sources: Vec<String>,
        manifests: &ManifestSet,
        outcome: &BatchOutcome,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            target_version: target.to_string(),
            sources,
            files_scanned: manifests.files_scanned,
            files_skipped: manifests.files_skipped,
            resources_found: manifests.len(),
            resources_analyzed: outcome.analyzed,
            resources_skipped: outcome.skipped,
            breaking_changes: outcome.verdicts.iter().map(VerdictEntry::from).collect(),
            file_changes: Vec::new(),
        }
    }

    /// Attach the files produced by the writer (builder pattern).
    pub fn with_file_changes(mut self, written: Vec<WrittenFile>) -> Self {
        self.file_changes = written;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.breaking_changes.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON form to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(|source| KupaError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Plain-text report for the terminal.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "KuPa analysis for Kubernetes {}\n",
        report.target_version
    ));
    out.push_str(&format!(
        "Sources: {}\n",
        report.sources.join(" -> ")
    ));
    out.push_str(&format!(
        "Files: {} scanned, {} skipped. Resources: {} found, {} analyzed",
        report.files_scanned, report.files_skipped, report.resources_found, report.resources_analyzed
    ));
    if report.resources_skipped > 0 {
        out.push_str(&format!(", {} not analyzed (cancelled)", report.resources_skipped));
    }
    out.push_str(".\n\n");

    if report.is_clean() {
        out.push_str("No breaking changes found.\n");
    } else {
        out.push_str(&format!(
            "Found {} breaking change(s):\n\n",
            report.breaking_changes.len()
        ));
        for entry in &report.breaking_changes {
            let name = match &entry.resource_namespace {
                Some(ns) => format!("{ns}/{}", entry.resource_name),
                None => entry.resource_name.clone(),
            };
            out.push_str(&format!(
                "- [{}] {}/{} '{}' in {}\n",
                entry.change_type, entry.resource_kind, entry.resource_api_version, name, entry.file_path
            ));
            out.push_str(&format!("  {}\n", entry.description));
            out.push_str(&format!("  Action: {}\n", entry.recommended_action));
            if let Some(api) = &entry.fixed_api_version {
                out.push_str(&format!("  Fix: apiVersion {} -> {}\n", entry.resource_api_version, api));
            }
        }
    }

    if !report.file_changes.is_empty() {
        out.push_str("\nWritten files:\n");
        for file in &report.file_changes {
            out.push_str(&format!(
                "- {} ({} change(s), explained in {})\n",
                file.updated.display(),
                file.changes,
                file.rationale.display()
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use kupa_domain::Resource;

    fn deployment_verdict() -> BreakingChange {
        let body: serde_yaml::Value = serde_yaml::from_str(
            "apiVersion: apps/v1beta2\nkind: Deployment\nmetadata:\n  name: web\n  namespace: prod\n",
        )
        .unwrap();
        let resource = Arc::new(Resource::from_document(body, Path::new("deploy.yaml")).unwrap());
        crate::knowledge::check(&resource, &KubeVersion::parse("v1.25").unwrap()).unwrap()
    }

    fn report() -> AnalysisReport {
        let verdict = deployment_verdict();
        let manifests = ManifestSet {
            resources: vec![Arc::clone(&verdict.resource)],
            files_scanned: 1,
            files_skipped: 0,
        };
        let outcome = BatchOutcome {
            verdicts: vec![verdict],
            analyzed: 1,
            skipped: 0,
        };
        AnalysisReport::new(
            &KubeVersion::parse("v1.25").unwrap(),
            vec!["null".to_string(), "static".to_string()],
            &manifests,
            &outcome,
        )
    }

    #[test]
    fn test_entry_carries_fixed_api_version() {
        let report = report();
        let entry = &report.breaking_changes[0];
        assert_eq!(entry.resource_kind, "Deployment");
        assert_eq!(entry.resource_namespace.as_deref(), Some("prod"));
        assert_eq!(entry.change_type, "API_REMOVED");
        assert_eq!(entry.fixed_api_version.as_deref(), Some("apps/v1"));
    }

    #[test]
    fn test_render_text_lists_verdicts_and_files() {
        let report = report().with_file_changes(vec![WrittenFile {
            original: PathBuf::from("deploy.yaml"),
            updated: PathBuf::from("deploy-updated-1.yaml"),
            rationale: PathBuf::from("deploy-updated-1.yaml.diff.txt"),
            changes: 1,
        }]);
        let text = render_text(&report);
        assert!(text.contains("Kubernetes v1.25"));
        assert!(text.contains("Sources: null -> static"));
        assert!(text.contains("- [API_REMOVED] Deployment/apps/v1beta2 'prod/web' in deploy.yaml"));
        assert!(text.contains("Fix: apiVersion apps/v1beta2 -> apps/v1"));
        assert!(text.contains("deploy-updated-1.yaml (1 change(s)"));
    }

    #[test]
    fn test_clean_report() {
        let report = AnalysisReport::new(
            &KubeVersion::parse("v1.28.0").unwrap(),
            vec!["static".to_string()],
            &ManifestSet::default(),
            &BatchOutcome::default(),
        );
        assert!(report.is_clean());
        assert!(render_text(&report).contains("No breaking changes found."));
    }

    #[test]
    fn test_write_json_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = report();
        report.write_json(&path).unwrap();

        let loaded: AnalysisReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
    }
}
