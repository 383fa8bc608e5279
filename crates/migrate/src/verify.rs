//! Post-run verification of the objects a schema is expected to create

use tracing::{error, info, warn};

use crate::definitions::{BucketCheck, BucketSpec, TableCheck, VerificationReport};
use crate::remote::RemoteService;

/// Objects that must exist after provisioning
#[derive(Debug, Clone, Default)]
pub struct VerifyTargets {
    pub tables: Vec<String>,
    pub bucket: Option<String>,
}

/// Read-only existence checks, plus one remediation for a missing bucket
pub struct Verifier<'a> {
    remote: &'a dyn RemoteService,
}

impl<'a> Verifier<'a> {
    pub fn new(remote: &'a dyn RemoteService) -> Self {
        Self { remote }
    }

    /// Check every target. Failures are logged and recorded, never returned.
    pub async fn verify(&self, targets: &VerifyTargets) -> VerificationReport {
        let mut report = VerificationReport::default();

        for table in &targets.tables {
            let check = self.check_table(table).await;
            report.tables.push((table.clone(), check));
        }

        if let Some(bucket) = &targets.bucket {
            let check = self.check_bucket(bucket).await;
            report.bucket = Some((bucket.clone(), check));
        }

        report
    }

    async fn check_table(&self, table: &str) -> TableCheck {
        match self.remote.count_rows(table).await {
            Ok(rows) => {
                info!("Table '{}' is reachable ({} row(s))", table, rows);
                TableCheck::Present { rows }
            }
            Err(err) => {
                error!("Table '{}' check failed: {}", table, err);
                TableCheck::Missing {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn check_bucket(&self, name: &str) -> BucketCheck {
        match self.remote.list_buckets().await {
            Ok(buckets) if buckets.iter().any(|b| b.id == name || b.name == name) => {
                info!("Bucket '{}' exists", name);
                return BucketCheck::Present;
            }
            Ok(_) => warn!("Bucket '{}' not found, creating it", name),
            Err(err) => warn!(
                "Could not list buckets ({}), attempting to create '{}'",
                err, name
            ),
        }

        match self.remote.create_bucket(&BucketSpec::minimal(name)).await {
            Ok(()) => {
                info!("Bucket '{}' created", name);
                BucketCheck::Created
            }
            Err(err) if err.is_already_exists() => {
                info!("Bucket '{}' exists", name);
                BucketCheck::Present
            }
            Err(err) => {
                error!("Bucket '{}' is missing and could not be created: {}", name, err);
                BucketCheck::Missing {
                    reason: err.to_string(),
                }
            }
        }
    }
}
