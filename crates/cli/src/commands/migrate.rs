use std::path::PathBuf;

use anyhow::Context;
use mentorly_core::ProvisionConfig;
use mentorly_migrate::runner::{load_documents, log_summary, log_verification};
use mentorly_migrate::{
    FailurePolicy, ProvisionManifest, ProvisionRunner, RestClient, RestClientOptions, SplitMode,
};
use tracing::{info, warn};

/// How a command that completed wants the process to exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Failures were found and `--strict` was requested
    FailuresReported,
}

/// Command-line values layered over the manifest
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub manifest: Option<PathBuf>,
    pub schema_files: Vec<PathBuf>,
    pub parsed: bool,
    pub policy: Option<FailurePolicy>,
    pub timeout_secs: Option<u64>,
}

pub async fn run(overrides: Overrides, strict: bool) -> anyhow::Result<RunStatus> {
    let manifest = resolve_manifest(&overrides)?;
    let client = connect(&manifest)?;

    let runner = ProvisionRunner::new(&client, manifest);
    let report = runner.run().await?;
    log_summary(&report);

    if report.has_failures() {
        if strict {
            warn!("Provisioning finished with failures");
            return Ok(RunStatus::FailuresReported);
        }
        warn!(
            "{}; rerun with --strict to turn failures into a non-zero exit",
            failure_summary(report.execution.failed(), report.verification.missing())
        );
    }

    info!("✅ Provisioning complete");
    Ok(RunStatus::Success)
}

pub fn plan(overrides: Overrides) -> anyhow::Result<RunStatus> {
    let manifest = resolve_manifest(&overrides)?;
    let documents = load_documents(&manifest)?;

    for document in &documents {
        println!("-- {} ({} statement(s))", document.label(), document.len());
        for statement in &document.statements {
            println!("-- [{}]", statement.ordinal);
            println!("{};", statement.sql);
        }
    }

    Ok(RunStatus::Success)
}

pub async fn verify(overrides: Overrides, strict: bool) -> anyhow::Result<RunStatus> {
    let manifest = resolve_manifest(&overrides)?;
    let client = connect(&manifest)?;

    let report = ProvisionRunner::new(&client, manifest).verify().await;
    log_verification(&report);

    if strict && !report.is_clean() {
        return Ok(RunStatus::FailuresReported);
    }
    Ok(RunStatus::Success)
}

fn failure_summary(failed: usize, missing: usize) -> String {
    format!("{} statement(s) failed, {} object(s) missing", failed, missing)
}

fn resolve_manifest(overrides: &Overrides) -> anyhow::Result<ProvisionManifest> {
    let mut manifest = ProvisionManifest::resolve(overrides.manifest.as_deref())?;

    if !overrides.schema_files.is_empty() {
        manifest.schema_files = overrides.schema_files.clone();
    }
    if overrides.parsed {
        manifest.split_mode = SplitMode::Parsed;
    }
    if let Some(policy) = overrides.policy {
        manifest.failure_policy = policy;
    }
    if let Some(timeout) = overrides.timeout_secs {
        manifest.request_timeout_secs = timeout;
    }

    manifest.validate()?;
    Ok(manifest)
}

fn connect(manifest: &ProvisionManifest) -> anyhow::Result<RestClient> {
    let config = ProvisionConfig::from_env().context("Cannot connect to the backend")?;
    info!(
        "Using {} with the {} key ({})",
        config.endpoint(),
        config.credential().kind(),
        config.credential().source()
    );

    let options = RestClientOptions {
        timeout: manifest.request_timeout(),
        rpc_function: manifest.rpc_function.clone(),
    };
    Ok(RestClient::new(&config, options)?)
}
