//! Result writer: corrected manifests plus a rationale file per manifest.
//!
//! Originals are never touched. Each manifest with verdicts gets a new,
//! timestamped copy with the affected documents replaced, and a companion
//! text file explaining every change.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kupa_domain::BreakingChange;

use crate::config::OutputConfig;
use crate::error::{KupaError, Result};
use crate::manifest::{identify, parse_documents};

/// Upper bound on `-N` disambiguators tried for one output name.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Files produced for one original manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub original: PathBuf,
    pub updated: PathBuf,
    pub rationale: PathBuf,
    /// Verdicts actually applied to the copy.
    pub changes: usize,
}

/// Writes verdicts back out as new manifest files.
#[derive(Debug, Clone, Default)]
pub struct ResultWriter {
    output: OutputConfig,
}

impl ResultWriter {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    /// Apply verdicts, stamping output names with the current local time.
    pub fn apply(&self, verdicts: &[BreakingChange]) -> Result<Vec<WrittenFile>> {
        self.apply_at(verdicts, Local::now())
    }

    /// Apply verdicts using `now` for output names.
    pub fn apply_at(
        &self,
        verdicts: &[BreakingChange],
        now: DateTime<Local>,
    ) -> Result<Vec<WrittenFile>> {
        if verdicts.is_empty() {
            info!("No breaking changes detected, nothing to write");
            return Ok(Vec::new());
        }

        let mut stamp = String::new();
        write!(stamp, "{}", now.format(&self.output.timestamp_format)).map_err(|_| {
            KupaError::TimestampFormat(self.output.timestamp_format.clone())
        })?;
        group_by_file(verdicts)
            .into_iter()
            .map(|(file, group)| self.write_file(&file, &group, &stamp))
            .collect()
    }

    fn write_file(
        &self,
        original: &Path,
        verdicts: &[&BreakingChange],
        stamp: &str,
    ) -> Result<WrittenFile> {
        let text = std::fs::read_to_string(original).map_err(|source| KupaError::Read {
            path: original.to_path_buf(),
            source,
        })?;
        let mut documents = parse_documents(&text).map_err(|e| KupaError::Manifest {
            path: original.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut replaced = vec![false; documents.len()];
        let mut applied: Vec<&BreakingChange> = Vec::with_capacity(verdicts.len());
        for verdict in verdicts {
            let slot = documents
                .iter()
                .enumerate()
                .position(|(i, doc)| !replaced[i] && identify(doc, &verdict.resource.body));
            match slot {
                Some(i) => {
                    documents[i] = verdict.fixed_body.clone();
                    replaced[i] = true;
                    applied.push(verdict);
                }
                None => warn!(
                    file = %original.display(),
                    resource = %verdict.resource,
                    "Resource no longer present in file, skipping"
                ),
            }
        }

        let rendered = render_documents(&documents)?;
        let (updated, mut file) = self.create_output(original, stamp)?;
        file.write_all(rendered.as_bytes())
            .map_err(|source| KupaError::Write {
                path: updated.clone(),
                source,
            })?;
        info!(file = %updated.display(), "Updated file written");

        let rationale = self.rationale_path(&updated);
        std::fs::write(&rationale, render_rationale(original, &updated, &applied)).map_err(
            |source| KupaError::Write {
                path: rationale.clone(),
                source,
            },
        )?;
        info!(file = %rationale.display(), "Explanation file written");

        Ok(WrittenFile {
            original: original.to_path_buf(),
            updated,
            rationale,
            changes: applied.len(),
        })
    }

    /// Create the output file exclusively, adding `-1`, `-2`, ... on collision.
    fn create_output(&self, original: &Path, stamp: &str) -> Result<(PathBuf, File)> {
        let directory = match &self.output.directory {
            Some(dir) => dir.clone(),
            None => original
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = directory.join(self.output_name(original, stamp, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(KupaError::Write {
                        path: candidate,
                        source,
                    })
                }
            }
        }
        Err(KupaError::OutputExhausted {
            original: original.to_path_buf(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    /// File name from the template; `attempt > 0` adds `-<attempt>` before
    /// the extension.
    fn output_name(&self, original: &Path, stamp: &str, attempt: usize) -> String {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let template = &self.output.name_template;
        let (template, ext) = match attempt {
            0 => (template.clone(), ext),
            n if template.contains("{ext}") => (template.clone(), format!("-{n}{ext}")),
            n => (format!("{template}-{n}"), ext),
        };
        template
            .replace("{stem}", &stem)
            .replace("{timestamp}", stamp)
            .replace("{ext}", &ext)
    }

    fn rationale_path(&self, updated: &Path) -> PathBuf {
        let mut name = OsString::from(updated.as_os_str());
        name.push(&self.output.rationale_suffix);
        PathBuf::from(name)
    }
}

/// Verdicts grouped by source file, files in first-seen order.
fn group_by_file(verdicts: &[BreakingChange]) -> Vec<(PathBuf, Vec<&BreakingChange>)> {
    let mut groups: Vec<(PathBuf, Vec<&BreakingChange>)> = Vec::new();
    for verdict in verdicts {
        let file = &verdict.resource.source_file;
        match groups.iter_mut().find(|(path, _)| path == file) {
            Some((_, group)) => group.push(verdict),
            None => groups.push((file.clone(), vec![verdict])),
        }
    }
    groups
}

/// Multi-document YAML text.
pub fn render_documents(documents: &[serde_yaml::Value]) -> Result<String> {
    let rendered = documents
        .iter()
        .map(serde_yaml::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rendered.join("---\n"))
}

/// The explanation written next to a corrected manifest.
pub fn render_rationale(original: &Path, updated: &Path, verdicts: &[&BreakingChange]) -> String {
    let file_name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str(&format!("# Changes made to {file_name}\n"));
    out.push_str(&format!("# Original file: {}\n", original.display()));
    out.push_str(&format!("# Updated file: {}\n\n", updated.display()));
    for verdict in verdicts {
        let resource = &verdict.resource;
        out.push_str(&format!(
            "## Resource: {}/{} '{}'\n",
            resource.kind, resource.api_version, resource.name
        ));
        out.push_str(&format!("Change type: {}\n", verdict.change_kind));
        out.push_str(&format!("Description: {}\n", verdict.description));
        out.push_str(&format!("Recommended action: {}\n\n", verdict.recommended_action));
    }
    out
}
