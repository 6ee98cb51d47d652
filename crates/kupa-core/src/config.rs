//! Configuration: defaults, then a YAML file, then the environment.
//!
//! The result is an immutable [`KupaConfig`] passed explicitly to whatever
//! needs it. File values are merged into the defaults key by key, so a file
//! only has to mention what it changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use kupa_docs::DocsConfig;
use kupa_domain::KubeVersion;
use kupa_model::{ModelConfig, ModelProvider};

use crate::error::{KupaError, Result};

/// File name looked for in the discovery locations.
pub const CONFIG_FILE_NAME: &str = "kupa.yaml";

/// Shown instead of a configured credential.
const REDACTED: &str = "***";

/// Naming of written artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Placeholders: `{stem}`, `{timestamp}`, `{ext}` (with leading dot).
    pub name_template: String,
    /// chrono format string for `{timestamp}`
    pub timestamp_format: String,
    /// Appended to the corrected file's name for the rationale file.
    pub rationale_suffix: String,
    /// Write next to the original when unset.
    pub directory: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name_template: "{stem}-updated-{timestamp}{ext}".to_string(),
            timestamp_format: "%Y%m%d%H%M%S".to_string(),
            rationale_suffix: ".diff.txt".to_string(),
            directory: None,
        }
    }
}

/// Batch execution limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resources resolved at once.
    pub concurrency: usize,
    /// Upper bound for a single oracle call.
    pub oracle_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            oracle_timeout_secs: 120,
        }
    }
}

/// Complete KuPa configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KupaConfig {
    /// Version aliases such as `latest`.
    pub kubernetes_versions: BTreeMap<String, String>,
    pub model: ModelConfig,
    pub docs: DocsConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

impl Default for KupaConfig {
    fn default() -> Self {
        let mut kubernetes_versions = BTreeMap::new();
        kubernetes_versions.insert("latest".to_string(), "v1.28.0".to_string());
        kubernetes_versions.insert("lts".to_string(), "v1.24.0".to_string());
        Self {
            kubernetes_versions,
            model: ModelConfig::default(),
            docs: DocsConfig::default(),
            output: OutputConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl KupaConfig {
    /// Load the effective configuration.
    ///
    /// An explicit file must be readable and valid. Otherwise the first
    /// discovered file is used, and a broken one only produces a warning.
    /// Environment overrides apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match candidate_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(&path).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                    Self::default()
                }),
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults with one YAML file merged on top.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| KupaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text).map_err(|e| KupaError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Defaults with a YAML document merged on top.
    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let mut merged = serde_yaml::to_value(Self::default())?;
        let overlay: Value = serde_yaml::from_str(text)?;
        merge_yaml(&mut merged, overlay);
        serde_yaml::from_value(merged)
    }

    /// Apply environment overrides through `lookup`; bad values are ignored
    /// with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MODEL_PROVIDER") {
            match raw.parse::<ModelProvider>() {
                Ok(provider) => self.model.provider = provider,
                Err(e) => warn!(error = %e, "Ignoring MODEL_PROVIDER"),
            }
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(model) = lookup("KUPA_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model.model = model;
        }
        if let Some(url) = lookup("KUPA_OLLAMA_URL").filter(|u| !u.trim().is_empty()) {
            self.model.local_url = url;
        }
        if let Some(raw) = lookup("KUPA_CONCURRENCY") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.pipeline.concurrency = n,
                _ => warn!(value = %raw, "Ignoring KUPA_CONCURRENCY, expected a positive integer"),
            }
        }
    }

    /// Map an alias (case-insensitive) to its version; anything else is
    /// returned unchanged.
    pub fn resolve_version(&self, alias: &str) -> String {
        let alias = alias.trim();
        self.kubernetes_versions
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(alias))
            .map(|(_, version)| version.clone())
            .unwrap_or_else(|| alias.to_string())
    }

    /// Resolve an alias and parse the result.
    pub fn target_version(&self, alias: &str) -> Result<KubeVersion> {
        let resolved = self.resolve_version(alias);
        KubeVersion::parse(&resolved).map_err(|source| KupaError::InvalidVersion {
            input: alias.to_string(),
            source,
        })
    }

    /// Copy safe to print: the credential is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.model.api_key.is_some() {
            copy.model.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    /// Override the batch concurrency (builder pattern).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.pipeline.concurrency = concurrency.max(1);
        self
    }
}

/// Where a config file is looked for, in priority order.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(CONFIG_FILE_NAME),
        Path::new("config").join(CONFIG_FILE_NAME),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    paths.push(Path::new("/etc/kupa").join(CONFIG_FILE_NAME));
    paths
}

/// Merge `overlay` into `base`: mappings merge key by key, anything else
/// replaces.
pub fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        // An empty file parses as null and changes nothing.
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = KupaConfig::default();
        assert_eq!(config.resolve_version("latest"), "v1.28.0");
        assert_eq!(config.resolve_version("LTS"), "v1.24.0");
        assert_eq!(config.model.model, "gpt-4-turbo");
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.output.timestamp_format, "%Y%m%d%H%M%S");
    }

    #[test]
    fn test_partial_file_merges_into_defaults() {
        let config = KupaConfig::from_yaml_str(
            "kubernetes_versions:\n  edge: v1.30.1\nmodel:\n  provider: ollama\n  model: llama3\npipeline:\n  concurrency: 8\n",
        )
        .unwrap();

        assert_eq!(config.resolve_version("edge"), "v1.30.1");
        assert_eq!(config.resolve_version("latest"), "v1.28.0");
        assert_eq!(config.model.provider, ModelProvider::Local);
        assert_eq!(config.model.model, "llama3");
        assert_eq!(config.model.temperature, 0.1);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.pipeline.oracle_timeout_secs, 120);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(KupaConfig::from_yaml_str("").unwrap(), KupaConfig::default());
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        assert!(KupaConfig::from_yaml_str("pipeline:\n  concurrency: lots\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = KupaConfig::default();
        config.apply_env(env(&[
            ("MODEL_PROVIDER", "ollama"),
            ("OPENAI_API_KEY", "sk-env"),
            ("KUPA_MODEL", "codellama:13b"),
            ("KUPA_OLLAMA_URL", "http://gpu-box:11434"),
            ("KUPA_CONCURRENCY", "2"),
        ]));

        assert_eq!(config.model.provider, ModelProvider::Local);
        assert_eq!(config.model.hosted_credential(), Some("sk-env"));
        assert_eq!(config.model.model, "codellama:13b");
        assert_eq!(config.model.local_url, "http://gpu-box:11434");
        assert_eq!(config.pipeline.concurrency, 2);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = KupaConfig::default();
        config.apply_env(env(&[("MODEL_PROVIDER", "bard"), ("KUPA_CONCURRENCY", "0")]));
        assert_eq!(config, KupaConfig::default());
    }

    #[test]
    fn test_target_version_resolves_alias() {
        let config = KupaConfig::default();
        assert_eq!(config.target_version("latest").unwrap().components(), (1, 28, 0));
        assert_eq!(config.target_version("v1.25").unwrap().components(), (1, 25, 0));
        assert!(matches!(
            config.target_version("newest"),
            Err(KupaError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_redacted_masks_credential() {
        let mut config = KupaConfig::default();
        config.model.api_key = Some("sk-secret".to_string());
        let shown = serde_yaml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn test_explicit_file_errors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(matches!(
            KupaConfig::load(Some(&missing)),
            Err(KupaError::Read { .. })
        ));

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "model: [unterminated").unwrap();
        assert!(matches!(
            KupaConfig::from_file(&broken),
            Err(KupaError::Config { .. })
        ));
    }
}
