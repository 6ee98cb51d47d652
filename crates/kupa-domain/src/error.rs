//! Error types for kupa-domain

use thiserror::Error;

/// Errors raised while parsing a Kubernetes version string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Input was empty (or only a `v` prefix)
    #[error("Kubernetes version must not be empty")]
    Empty,

    /// A component had no leading digits
    #[error("Invalid Kubernetes version '{input}': component '{component}' is not numeric")]
    NotNumeric { input: String, component: String },

    /// More than major.minor.patch
    #[error("Invalid Kubernetes version '{0}': too many components")]
    TooManyComponents(String),
}
