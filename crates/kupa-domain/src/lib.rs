//! KuPa Domain: shared types for the Kubernetes Upgrade Path Analyzer
//!
//! This crate holds the vocabulary every other KuPa crate speaks:
//! parsed manifest resources, the breaking-change verdicts produced for them,
//! the normalized oracle response, and the `Oracle` capability that the model
//! and documentation sources implement.
//!
//! ## Layer 0 - Domain
//!
//! Focus: immutable data, version ordering, and the oracle seam.
//!
//! ## Key Components
//!
//! - `Resource`: one Kubernetes object declaration from a manifest
//! - `BreakingChange`: the verdict for a resource that needs a fix
//! - `OracleResponse`: what any knowledge source answers
//! - `Oracle`: async capability implemented per provider
//! - `KubeVersion`: dotted-numeric Kubernetes version

mod error;
pub mod fakes;
mod oracle;
mod resource;
mod verdict;
mod version;

pub use error::VersionError;
pub use oracle::{NullOracle, Oracle};
pub use resource::Resource;
pub use verdict::{BreakingChange, ChangeKind, OracleResponse};
pub use version::KubeVersion;
