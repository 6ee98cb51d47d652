//! Breaking-change resolution pipeline.
//!
//! Each resource is put to the knowledge sources in a fixed order:
//!
//! 1. local model (when the local provider is selected)
//! 2. hosted model (when a real credential is configured)
//! 3. documentation
//! 4. static table
//!
//! The first source that asserts a breaking change wins. Model answers also
//! have to be confident; documentation and static answers do not. A source
//! that errors, panics or runs past the oracle timeout counts as "no answer"
//! and the next stage runs.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, instrument, warn};

use kupa_docs::{DocsOracle, HttpFetcher};
use kupa_domain::{BreakingChange, KubeVersion, NullOracle, Oracle, OracleResponse, Resource};
use kupa_model::{HostedModelClient, LocalModelClient, ModelProvider};

use crate::config::{KupaConfig, PipelineConfig};
use crate::knowledge;

/// Execution limits for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum resources resolved at once (also bounds in-flight oracle calls).
    pub concurrency: usize,
    /// Upper bound for any single oracle call.
    pub oracle_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            oracle_timeout: Duration::from_secs(config.oracle_timeout_secs),
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Verdicts in input order.
    pub verdicts: Vec<BreakingChange>,
    /// Resources that went through the pipeline.
    pub analyzed: usize,
    /// Resources never started because the batch was cancelled.
    pub skipped: usize,
}

/// The ordered multi-source decision procedure.
///
/// Cloning is cheap: oracles are shared behind `Arc`.
#[derive(Clone)]
pub struct ResolutionPipeline {
    local_model: Option<Arc<dyn Oracle>>,
    hosted_model: Option<Arc<dyn Oracle>>,
    docs: Arc<dyn Oracle>,
    settings: PipelineSettings,
}

impl ResolutionPipeline {
    /// Pipeline with only a documentation source; add models with the
    /// `with_*` builders.
    pub fn new(docs: Arc<dyn Oracle>) -> Self {
        Self {
            local_model: None,
            hosted_model: None,
            docs,
            settings: PipelineSettings::default(),
        }
    }

    /// Static table only: no network access at all.
    pub fn offline() -> Self {
        Self::new(Arc::new(NullOracle))
    }

    pub fn with_local_model(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.local_model = Some(oracle);
        self
    }

    pub fn with_hosted_model(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.hosted_model = Some(oracle);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Pick oracle implementations from configuration.
    ///
    /// A source that cannot be constructed is left out with a warning; the
    /// pipeline itself always builds.
    pub fn from_config(config: &KupaConfig) -> Self {
        let docs: Arc<dyn Oracle> =
            match HttpFetcher::new(Duration::from_secs(config.docs.timeout_secs)) {
                Ok(fetcher) => Arc::new(DocsOracle::new(fetcher, config.docs.clone())),
                Err(e) => {
                    warn!(error = %e, "Documentation oracle unavailable");
                    Arc::new(NullOracle)
                }
            };
        let mut pipeline =
            Self::new(docs).with_settings(PipelineSettings::from(&config.pipeline));

        if config.model.provider == ModelProvider::Local {
            match LocalModelClient::new(&config.model) {
                Ok(client) => pipeline = pipeline.with_local_model(Arc::new(client)),
                Err(e) => warn!(error = %e, "Local model oracle unavailable"),
            }
        }
        if config.model.hosted_credential().is_some() {
            match HostedModelClient::new(&config.model) {
                Ok(client) => pipeline = pipeline.with_hosted_model(Arc::new(client)),
                Err(e) => warn!(error = %e, "Hosted model oracle unavailable"),
            }
        } else {
            debug!("No hosted model credential, skipping hosted model");
        }

        info!(sources = ?pipeline.sources(), "Resolution pipeline ready");
        pipeline
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Names of the consulted sources, in order.
    pub fn sources(&self) -> Vec<String> {
        self.local_model
            .iter()
            .chain(self.hosted_model.iter())
            .chain(std::iter::once(&self.docs))
            .map(|oracle| oracle.name().to_string())
            .chain(std::iter::once("static".to_string()))
            .collect()
    }

    /// Decide whether `resource` breaks on `target`.
    #[instrument(skip_all, fields(kind = %resource.kind, api_version = %resource.api_version, name = %resource.name))]
    pub async fn resolve(
        &self,
        resource: &Arc<Resource>,
        target: &KubeVersion,
    ) -> Option<BreakingChange> {
        for model in self.local_model.iter().chain(self.hosted_model.iter()) {
            let response = self.consult(model, resource, target).await;
            if response.is_actionable() {
                info!(oracle = model.name(), "Model found breaking change");
                return Some(BreakingChange::from_response(Arc::clone(resource), response));
            }
            debug!(
                oracle = model.name(),
                breaking = response.breaking,
                confident = response.confident,
                "Model gave no actionable verdict"
            );
        }

        let response = self.consult(&self.docs, resource, target).await;
        if response.breaking {
            info!(oracle = self.docs.name(), "Documentation found breaking change");
            return Some(BreakingChange::from_response(Arc::clone(resource), response));
        }

        let verdict = knowledge::check(resource, target);
        if verdict.is_some() {
            info!(oracle = "static", "Static table found breaking change");
        }
        verdict
    }

    /// One oracle call, isolated in its own task and bounded in time.
    async fn consult(
        &self,
        oracle: &Arc<dyn Oracle>,
        resource: &Arc<Resource>,
        target: &KubeVersion,
    ) -> OracleResponse {
        let mut task = {
            let oracle = Arc::clone(oracle);
            let resource = Arc::clone(resource);
            let target = target.clone();
            tokio::spawn(async move { oracle.consult(&resource, &target).await })
        };

        match tokio::time::timeout(self.settings.oracle_timeout, &mut task).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(oracle = oracle.name(), error = %e, "Oracle task failed");
                OracleResponse::unavailable(format!("{} failed: {e}", oracle.name()))
            }
            Err(_) => {
                task.abort();
                warn!(
                    oracle = oracle.name(),
                    timeout_secs = self.settings.oracle_timeout.as_secs(),
                    "Oracle timed out"
                );
                OracleResponse::unavailable(format!("{} timed out", oracle.name()))
            }
        }
    }

    /// Resolve every resource; verdicts come back in input order.
    pub async fn analyze_batch(
        &self,
        resources: &[Arc<Resource>],
        target: &KubeVersion,
    ) -> Vec<BreakingChange> {
        let (_never, cancel) = watch::channel(false);
        self.analyze_batch_until(resources, target, cancel).await.verdicts
    }

    /// Like [`analyze_batch`](Self::analyze_batch), but stops starting new
    /// resources once `cancel` reads `true`. Resources already in flight run
    /// to completion or timeout.
    pub async fn analyze_batch_until(
        &self,
        resources: &[Arc<Resource>],
        target: &KubeVersion,
        cancel: watch::Receiver<bool>,
    ) -> BatchOutcome {
        info!(
            resources = resources.len(),
            target = %target,
            concurrency = self.settings.concurrency,
            "Analyzing batch"
        );
        let sem = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));

        let tasks: Vec<_> = resources
            .iter()
            .map(|resource| {
                let pipeline = self.clone();
                let resource = Arc::clone(resource);
                let target = target.clone();
                let sem = Arc::clone(&sem);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await.ok();
                    if *cancel.borrow() {
                        return None;
                    }
                    Some(pipeline.resolve(&resource, &target).await)
                })
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        for (joined, resource) in join_all(tasks).await.into_iter().zip(resources) {
            match joined {
                Ok(Some(verdict)) => {
                    outcome.analyzed += 1;
                    outcome.verdicts.extend(verdict);
                }
                Ok(None) => outcome.skipped += 1,
                Err(e) => {
                    outcome.analyzed += 1;
                    warn!(resource = %resource, error = %e, "Resolution task failed");
                }
            }
        }

        if outcome.skipped > 0 {
            warn!(skipped = outcome.skipped, "Batch cancelled before all resources were analyzed");
        }
        info!(
            analyzed = outcome.analyzed,
            verdicts = outcome.verdicts.len(),
            "Batch complete"
        );
        outcome
    }
}
