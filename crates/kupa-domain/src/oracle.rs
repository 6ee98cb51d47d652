//! The oracle capability.
//!
//! An oracle is any external knowledge source that can be asked "does this
//! resource break on that Kubernetes version, and how should it look
//! instead?". The model providers and the documentation miner each implement
//! [`Oracle`]; the pipeline only sees trait objects.

use async_trait::async_trait;

use crate::resource::Resource;
use crate::verdict::OracleResponse;
use crate::version::KubeVersion;

/// A knowledge source queried for one resource at a time.
///
/// Implementations must not fail: transport errors, malformed replies and
/// the like are folded into [`OracleResponse::unavailable`] so the pipeline
/// can move on to the next source.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Short name used in logs (`hosted-model`, `docs`, ...).
    fn name(&self) -> &str;

    /// Ask about `resource` when upgrading to `target`.
    async fn consult(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse;
}

/// Oracle that never reports a breaking change.
///
/// Stands in for the documentation source when running offline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOracle;

#[async_trait]
impl Oracle for NullOracle {
    fn name(&self) -> &str {
        "null"
    }

    async fn consult(&self, _resource: &Resource, _target: &KubeVersion) -> OracleResponse {
        OracleResponse::no_change()
    }
}
