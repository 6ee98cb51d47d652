//! KuPa - Kubernetes Upgrade Path Analyzer CLI
//!
//! The `kupa` command finds Kubernetes manifests that will break on a target
//! cluster version and writes corrected copies next to them.
//!
//! ## Commands
//!
//! - `analyze`: scan manifests, report breaking changes, write fixes
//! - `check`: look up one kind/apiVersion in the static removal table
//! - `versions`: list the configured version aliases
//! - `config`: print the effective configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn, Level};

use kupa_core::{
    knowledge, manifest, render_text, AnalysisReport, KupaConfig, PipelineSettings,
    ResolutionPipeline, ResultWriter,
};

#[derive(Parser)]
#[command(name = "kupa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Kubernetes Upgrade Path Analyzer", long_about = None)]
struct Cli {
    /// Config file (default: search ./kupa.yaml, ./config/kupa.yaml, ...)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze manifests for breaking changes on a target version
    Analyze {
        /// Manifest file or directory
        #[arg(short, long)]
        path: PathBuf,

        /// Target version or alias (see `kupa versions`)
        #[arg(short = 'k', long, default_value = "latest")]
        kube_version: String,

        /// Report only, write no files
        #[arg(long)]
        dry_run: bool,

        /// Use the static removal table only (no network)
        #[arg(long)]
        offline: bool,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Resources analyzed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Also save the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check one kind/apiVersion against the static removal table
    Check {
        /// Resource kind, e.g. Deployment
        #[arg(long)]
        kind: String,

        /// apiVersion, e.g. apps/v1beta2
        #[arg(long)]
        api_version: String,

        /// Target version or alias
        #[arg(short = 'k', long, default_value = "latest")]
        kube_version: String,
    },

    /// List Kubernetes version aliases
    Versions,

    /// Print the effective configuration (credentials masked)
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    kupa_core::telemetry::init_tracing(cli.json_logs, level);

    let config = KupaConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Analyze {
            path,
            kube_version,
            dry_run,
            offline,
            format,
            concurrency,
            report,
        } => {
            let config = match concurrency {
                Some(n) => config.with_concurrency(n),
                None => config,
            };
            let options = AnalyzeOptions {
                kube_version,
                dry_run,
                offline,
                report_path: report,
            };
            let report = cmd_analyze(&config, &path, &options).await?;
            match format {
                OutputFormat::Text => print!("{}", render_text(&report)),
                OutputFormat::Json => println!("{}", report.to_json()?),
            }
            Ok(())
        }
        Commands::Check {
            kind,
            api_version,
            kube_version,
        } => {
            println!("{}", cmd_check(&config, &kind, &api_version, &kube_version)?);
            Ok(())
        }
        Commands::Versions => {
            print!("{}", cmd_versions(&config));
            Ok(())
        }
        Commands::Config => {
            let yaml = serde_yaml::to_string(&config.redacted())
                .context("Failed to serialize configuration")?;
            print!("{yaml}");
            Ok(())
        }
    }
}

struct AnalyzeOptions {
    kube_version: String,
    dry_run: bool,
    offline: bool,
    report_path: Option<PathBuf>,
}

/// Analyze manifests under `path`; Ctrl-C stops starting new resources.
async fn cmd_analyze(
    config: &KupaConfig,
    path: &Path,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport> {
    let target = config
        .target_version(&options.kube_version)
        .context("Failed to resolve target version")?;
    let manifests = manifest::load(path)
        .with_context(|| format!("Failed to load manifests from {}", path.display()))?;

    let pipeline = if options.offline {
        ResolutionPipeline::offline().with_settings(PipelineSettings::from(&config.pipeline))
    } else {
        ResolutionPipeline::from_config(config)
    };
    info!(target = %target, resources = manifests.len(), "Starting analysis");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing resources already in flight");
            cancel_tx.send_replace(true);
        }
    });
    let outcome = pipeline
        .analyze_batch_until(&manifests.resources, &target, cancel_rx)
        .await;
    interrupt.abort();

    let mut report = AnalysisReport::new(&target, pipeline.sources(), &manifests, &outcome);
    if options.dry_run {
        info!("Dry run, no manifests written");
    } else {
        let written = ResultWriter::new(config.output.clone())
            .apply(&outcome.verdicts)
            .context("Failed to write results")?;
        report = report.with_file_changes(written);
    }

    if let Some(report_path) = &options.report_path {
        report
            .write_json(report_path)
            .with_context(|| format!("Failed to save report to {}", report_path.display()))?;
        info!(file = %report_path.display(), "Report saved");
    }
    Ok(report)
}

/// One-line answer from the static removal table.
fn cmd_check(
    config: &KupaConfig,
    kind: &str,
    api_version: &str,
    kube_version: &str,
) -> Result<String> {
    let target = config
        .target_version(kube_version)
        .context("Failed to resolve target version")?;

    let answer = match knowledge::lookup(kind, api_version) {
        Some(rule) if rule.fires(&target) => format!(
            "BREAKING on {target}: {} {}",
            rule.description,
            rule.recommended_action()
        ),
        Some(rule) => format!(
            "OK on {target}: {kind} {api_version} is served until {}",
            rule.removed_in
        ),
        None => format!("OK on {target}: no known removal for {kind} {api_version}"),
    };
    Ok(answer)
}

fn cmd_versions(config: &KupaConfig) -> String {
    let mut out = String::new();
    for (alias, version) in &config.kubernetes_versions {
        out.push_str(&format!("{alias:<10} {version}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str =
        "apiVersion: apps/v1beta2\nkind: Deployment\nmetadata:\n  name: web\n";

    #[test]
    fn test_analyze_args_parse() {
        let cli = Cli::try_parse_from([
            "kupa",
            "--verbose",
            "analyze",
            "--path",
            "manifests",
            "-k",
            "lts",
            "--dry-run",
            "--format",
            "json",
            "--concurrency",
            "8",
            "--report",
            "out.json",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                path,
                kube_version,
                dry_run,
                offline,
                format,
                concurrency,
                report,
            } => {
                assert_eq!(report, Some(PathBuf::from("out.json")));
                assert_eq!(path, PathBuf::from("manifests"));
                assert_eq!(kube_version, "lts");
                assert!(dry_run);
                assert!(!offline);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(concurrency, Some(8));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_analyze_requires_path() {
        assert!(Cli::try_parse_from(["kupa", "analyze"]).is_err());
    }

    #[test]
    fn test_check_reports_removal() {
        let config = KupaConfig::default();
        let answer = cmd_check(&config, "Deployment", "apps/v1beta2", "v1.25").unwrap();
        assert!(answer.starts_with("BREAKING on v1.25"));
        assert!(answer.contains("Update apiVersion to apps/v1"));

        let answer = cmd_check(&config, "Ingress", "extensions/v1beta1", "v1.21").unwrap();
        assert_eq!(
            answer,
            "OK on v1.21: Ingress extensions/v1beta1 is served until v1.22.0"
        );

        assert!(cmd_check(&config, "Deployment", "apps/v1beta2", "soon").is_err());
    }

    #[test]
    fn test_versions_lists_aliases() {
        let listing = cmd_versions(&KupaConfig::default());
        assert!(listing.contains("latest     v1.28.0\n"));
        assert!(listing.contains("lts        v1.24.0\n"));
    }

    #[tokio::test]
    async fn test_offline_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.yaml"), DEPLOYMENT).unwrap();

        let options = AnalyzeOptions {
            kube_version: "latest".to_string(),
            dry_run: true,
            offline: true,
            report_path: None,
        };
        let report = cmd_analyze(&KupaConfig::default(), dir.path(), &options)
            .await
            .unwrap();

        assert_eq!(report.target_version, "v1.28.0");
        assert_eq!(report.breaking_changes.len(), 1);
        assert!(report.file_changes.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_offline_run_writes_fixes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.yaml"), DEPLOYMENT).unwrap();

        let options = AnalyzeOptions {
            kube_version: "v1.16".to_string(),
            dry_run: false,
            offline: true,
            report_path: None,
        };
        let report = cmd_analyze(&KupaConfig::default(), dir.path(), &options)
            .await
            .unwrap();

        assert_eq!(report.file_changes.len(), 1);
        let updated = std::fs::read_to_string(&report.file_changes[0].updated).unwrap();
        assert!(updated.contains("apiVersion: apps/v1\n"));
    }

    #[tokio::test]
    async fn test_report_flag_saves_json_even_on_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let manifests = dir.path().join("manifests");
        std::fs::create_dir(&manifests).unwrap();
        std::fs::write(manifests.join("deploy.yaml"), DEPLOYMENT).unwrap();
        let report_path = dir.path().join("report.json");

        let options = AnalyzeOptions {
            kube_version: "v1.25".to_string(),
            dry_run: true,
            offline: true,
            report_path: Some(report_path.clone()),
        };
        let report = cmd_analyze(&KupaConfig::default(), &manifests, &options)
            .await
            .unwrap();

        let saved: AnalysisReport =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(saved, report);
        assert_eq!(saved.breaking_changes[0].resource_kind, "Deployment");
        assert_eq!(std::fs::read_dir(&manifests).unwrap().count(), 1);
    }
}
