//! KuPa Docs: documentation oracle
//!
//! Mines the published Kubernetes changelog for the target release and the
//! API reference page for deprecation notices, and turns what it finds about
//! one resource into an [`kupa_domain::OracleResponse`].
//!
//! ## Layer 1 - Knowledge sources
//!
//! All network access goes through the [`TextFetcher`] seam so the mining
//! logic can be tested against canned documents.

pub mod api_reference;
pub mod changelog;
pub mod config;
pub mod error;
pub mod fakes;
pub mod fetch;
pub mod oracle;

pub use api_reference::{scan_api_reference, ApiVersionInfo};
pub use changelog::{parse_changelog, ChangelogBucket, ChangelogDigest};
pub use config::DocsConfig;
pub use error::DocsError;
pub use fetch::{HttpFetcher, TextFetcher};
pub use oracle::{assemble_verdict, DocsOracle};

/// Result type for documentation operations
pub type Result<T> = std::result::Result<T, DocsError>;
