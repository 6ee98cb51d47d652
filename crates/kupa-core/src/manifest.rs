//! Manifest store: finding manifest files and extracting resources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use kupa_domain::Resource;

use crate::error::{KupaError, Result};

const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Resources loaded from a path, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub resources: Vec<Arc<Resource>>,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

impl ManifestSet {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Whether a path has a manifest extension (case-insensitive).
pub fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MANIFEST_EXTENSIONS
                .iter()
                .any(|m| ext.eq_ignore_ascii_case(m))
        })
        .unwrap_or(false)
}

/// Files to analyze under `path`.
///
/// A file is returned as is, whatever its extension. A directory is walked
/// recursively for `.yaml`/`.yml` files, sorted by path.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(KupaError::PathNotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_manifest_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    debug!(path = %path.display(), files = files.len(), "Discovered manifest files");
    Ok(files)
}

/// Every document of a multi-document YAML stream, empty ones dropped.
pub fn parse_documents(text: &str) -> std::result::Result<Vec<Value>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Resources declared in YAML text; fragments without identity are skipped.
///
/// A stream that fails to parse yields no resources.
pub fn parse_str(text: &str, source_file: &Path) -> Vec<Resource> {
    match parse_documents(text) {
        Ok(documents) => documents
            .into_iter()
            .filter_map(|doc| Resource::from_document(doc, source_file))
            .collect(),
        Err(e) => {
            warn!(file = %source_file.display(), error = %e, "Error parsing YAML file");
            Vec::new()
        }
    }
}

/// Resources declared in one file. Only an unreadable file is an error.
pub fn parse(file: &Path) -> Result<Vec<Resource>> {
    let text = std::fs::read_to_string(file).map_err(|source| KupaError::Read {
        path: file.to_path_buf(),
        source,
    })?;
    Ok(parse_str(&text, file))
}

/// Whether two documents declare the same resource.
///
/// Compares kind, apiVersion, name and namespace; a missing namespace only
/// equals another missing namespace.
pub fn identify(a: &Value, b: &Value) -> bool {
    fn metadata<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
        doc.get("metadata").and_then(|m| m.get(field))
    }
    a.is_mapping()
        && b.is_mapping()
        && a.get("kind") == b.get("kind")
        && a.get("apiVersion") == b.get("apiVersion")
        && metadata(a, "name") == metadata(b, "name")
        && metadata(a, "namespace") == metadata(b, "namespace")
}

/// Discover and parse everything under `path`.
///
/// An explicitly named file that cannot be read is fatal; unreadable files
/// met while walking a directory are skipped.
pub fn load(path: &Path) -> Result<ManifestSet> {
    let files = discover(path)?;
    let explicit_file = path.is_file();
    let mut set = ManifestSet::default();

    for file in &files {
        match parse(file) {
            Ok(resources) => {
                debug!(file = %file.display(), resources = resources.len(), "Parsed manifest");
                set.files_scanned += 1;
                set.resources.extend(resources.into_iter().map(Arc::new));
            }
            Err(e) if explicit_file => return Err(e),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Skipping unreadable manifest");
                set.files_skipped += 1;
            }
        }
    }

    info!(
        files = set.files_scanned,
        skipped = set.files_skipped,
        resources = set.resources.len(),
        "Loaded manifests"
    );
    Ok(set)
}
