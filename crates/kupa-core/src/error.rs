//! Error taxonomy for KuPa runs.
//!
//! Only fatal conditions live here. Oracle failures never surface as errors:
//! they degrade to "no verdict" at the oracle boundary.

use std::path::PathBuf;

use kupa_domain::VersionError;

/// Fatal errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum KupaError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid target version '{input}': {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: VersionError,
    },

    #[error("invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("manifest {} could not be parsed: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("invalid timestamp format '{0}'")]
    TimestampFormat(String),

    #[error("no free output name for {} after {attempts} attempts", original.display())]
    OutputExhausted { original: PathBuf, attempts: usize },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for KuPa core operations.
pub type Result<T> = std::result::Result<T, KupaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_the_path() {
        let err = KupaError::PathNotFound(PathBuf::from("/nope/manifests"));
        assert_eq!(err.to_string(), "path not found: /nope/manifests");

        let err = KupaError::InvalidVersion {
            input: "latest-ish".to_string(),
            source: VersionError::Empty,
        };
        assert!(err.to_string().starts_with("invalid target version 'latest-ish'"));
    }
}
