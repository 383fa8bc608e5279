//! Provision Runner - Ties extraction, execution and verification together
//!
//! All schema files are read and split before the first remote call, so an
//! unreadable file stops the run without touching the database.

use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::definitions::{
    BucketCheck, ProvisionReport, SchemaDocument, StatementOutcome, TableCheck,
    VerificationReport,
};
use crate::error::MigrateResult;
use crate::executor::StatementExecutor;
use crate::manifest::ProvisionManifest;
use crate::remote::RemoteService;
use crate::statements::load_schema;
use crate::verify::Verifier;

/// Runs one provisioning pass against a remote service
pub struct ProvisionRunner<'a> {
    remote: &'a dyn RemoteService,
    manifest: ProvisionManifest,
}

impl<'a> ProvisionRunner<'a> {
    pub fn new(remote: &'a dyn RemoteService, manifest: ProvisionManifest) -> Self {
        Self { remote, manifest }
    }

    /// Read and split every schema file named by the manifest
    pub fn load_documents(&self) -> MigrateResult<Vec<SchemaDocument>> {
        load_documents(&self.manifest)
    }

    /// Full pass: extract, execute, verify
    pub async fn run(&self) -> MigrateResult<ProvisionReport> {
        let documents = self.load_documents()?;
        Ok(self.run_documents(&documents).await)
    }

    /// Execute and verify already-extracted documents
    pub async fn run_documents(&self, documents: &[SchemaDocument]) -> ProvisionReport {
        let started_at = Utc::now();
        let start_time = Instant::now();

        info!(
            "Provisioning {} schema file(s) via {} (policy: {})",
            documents.len(),
            self.remote.service_name(),
            self.manifest.failure_policy
        );

        let executor = StatementExecutor::new(self.remote, self.manifest.executor_options());
        let execution = executor.execute_all(documents).await;

        let verification = self.verify().await;

        ProvisionReport {
            started_at,
            execution,
            verification,
            execution_time_ms: start_time.elapsed().as_millis(),
        }
    }

    /// Verification stage only
    pub async fn verify(&self) -> VerificationReport {
        info!("Verifying provisioned objects");
        Verifier::new(self.remote)
            .verify(&self.manifest.verify_targets())
            .await
    }
}

/// Read and split every schema file named by the manifest, in order
pub fn load_documents(manifest: &ProvisionManifest) -> MigrateResult<Vec<SchemaDocument>> {
    manifest
        .schema_files
        .iter()
        .map(|path| load_schema(path, manifest.split_mode))
        .collect()
}

/// Log the end-of-run summary
pub fn log_summary(report: &ProvisionReport) {
    let execution = &report.execution;

    for record in &execution.records {
        if let StatementOutcome::Failed { reason } = &record.outcome {
            error!(
                "Failed: {} #{} {}: {}",
                record.document, record.ordinal, record.summary, reason
            );
        }
    }

    info!(
        "Statements: {} applied, {} tolerated, {} failed, {} skipped ({} total, {} ms)",
        execution.applied(),
        execution.tolerated(),
        execution.failed(),
        execution.skipped(),
        execution.total(),
        report.execution_time_ms
    );
    if execution.aborted {
        warn!("Batch was aborted after the first failed statement");
    }

    log_verification(&report.verification);
}

/// Log the outcome of each verification check
pub fn log_verification(verification: &VerificationReport) {
    for (table, check) in &verification.tables {
        match check {
            TableCheck::Present { rows } => info!("Table {}: present ({} rows)", table, rows),
            TableCheck::Missing { reason } => error!("Table {}: missing ({})", table, reason),
        }
    }

    if let Some((bucket, check)) = &verification.bucket {
        match check {
            BucketCheck::Present => info!("Bucket {}: present", bucket),
            BucketCheck::Created => info!("Bucket {}: created during verification", bucket),
            BucketCheck::Missing { reason } => error!("Bucket {}: missing ({})", bucket, reason),
        }
    }
}
