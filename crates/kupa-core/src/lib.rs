//! KuPa Core: Kubernetes Upgrade Path Analyzer library
//!
//! Ties the knowledge sources together into an analysis run:
//!
//! 1. [`manifest`] finds manifest files and extracts resources
//! 2. [`pipeline`] puts each resource to the oracles and the static table
//! 3. [`writer`] writes corrected copies plus an explanation per file
//! 4. [`report`] summarizes the run as text or JSON
//!
//! ## Layer 2 - Orchestration
//!
//! Focus: ordering, bounded concurrency, and never touching the originals.

pub mod config;
pub mod error;
pub mod knowledge;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod telemetry;
pub mod writer;

pub use config::{KupaConfig, OutputConfig, PipelineConfig, CONFIG_FILE_NAME};
pub use error::{KupaError, Result};
pub use knowledge::StaticRule;
pub use manifest::ManifestSet;
pub use pipeline::{BatchOutcome, PipelineSettings, ResolutionPipeline};
pub use report::{render_text, AnalysisReport, VerdictEntry};
pub use writer::{ResultWriter, WrittenFile};

pub use kupa_domain::{BreakingChange, ChangeKind, KubeVersion, Oracle, OracleResponse, Resource};
