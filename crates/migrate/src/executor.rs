//! Statement Executor - Issues extracted statements against the remote service
//!
//! Statements are sent one at a time, in document order. Each is attempted
//! exactly once; there is no transaction around the batch and nothing is
//! rolled back. Idempotency conflicts are tolerated, and a failing statement
//! that targets `storage.buckets` gets one direct bucket-creation attempt.

use tracing::{error, info, warn};

use crate::definitions::{
    BucketSpec, ExecutionReport, FailurePolicy, FallbackOutcome, SchemaDocument, Statement,
    StatementOutcome, StatementRecord,
};
use crate::error::RemoteError;
use crate::remote::RemoteService;

/// Executor configuration
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub policy: FailurePolicy,
    /// Bucket created directly when a `storage.buckets` statement fails
    pub fallback_bucket: Option<BucketSpec>,
}

/// Sequential statement executor
pub struct StatementExecutor<'a> {
    remote: &'a dyn RemoteService,
    options: ExecutorOptions,
}

impl<'a> StatementExecutor<'a> {
    pub fn new(remote: &'a dyn RemoteService, options: ExecutorOptions) -> Self {
        Self { remote, options }
    }

    /// Execute every statement of every document, in order
    pub async fn execute_all(&self, documents: &[SchemaDocument]) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for document in documents {
            let label = document.label();
            info!(
                "Applying {} statement(s) from {}",
                document.len(),
                label
            );

            for statement in &document.statements {
                if report.aborted {
                    report.records.push(record(
                        &label,
                        statement,
                        StatementOutcome::Skipped,
                        None,
                    ));
                    continue;
                }

                let entry = self.execute_statement(&label, statement).await;
                if entry.outcome.is_failed() && self.options.policy == FailurePolicy::AbortOnError {
                    error!(
                        "Aborting batch after failure of statement {} in {}",
                        statement.ordinal, label
                    );
                    report.aborted = true;
                }
                report.records.push(entry);
            }
        }

        report
    }

    /// Execute a single statement and classify the result
    pub async fn execute_statement(&self, document: &str, statement: &Statement) -> StatementRecord {
        let summary = statement.summary();

        let err = match self.remote.exec_sql(&statement.sql).await {
            Ok(()) => {
                info!("[{}] ✓ {}", statement.ordinal, summary);
                return record(document, statement, StatementOutcome::Applied, None);
            }
            Err(err) => err,
        };

        let classified = classify_failure(&err);
        if !classified.is_failed() {
            warn!("[{}] already exists, skipping: {}", statement.ordinal, summary);
            return record(document, statement, classified, None);
        }

        error!("[{}] ✗ {}: {}", statement.ordinal, summary, err);

        let fallback = match &self.options.fallback_bucket {
            Some(spec) if statement.references_storage_bucket() => {
                Some(self.create_bucket_fallback(spec).await)
            }
            _ => None,
        };

        let outcome = match &fallback {
            Some(FallbackOutcome::Created) | Some(FallbackOutcome::AlreadyExists) => {
                StatementOutcome::Tolerated {
                    reason: format!("bucket provisioned via storage API after: {}", err),
                }
            }
            _ => StatementOutcome::Failed {
                reason: err.to_string(),
            },
        };

        record(document, statement, outcome, fallback)
    }

    async fn create_bucket_fallback(&self, spec: &BucketSpec) -> FallbackOutcome {
        info!(
            "Creating bucket '{}' through the storage API instead",
            spec.name
        );

        match self.remote.create_bucket(spec).await {
            Ok(()) => {
                info!("Bucket '{}' created", spec.name);
                FallbackOutcome::Created
            }
            Err(err) if err.is_already_exists() => {
                warn!("Bucket '{}' already exists", spec.name);
                FallbackOutcome::AlreadyExists
            }
            Err(err) => {
                error!("Bucket '{}' could not be created: {}", spec.name, err);
                FallbackOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Map a remote failure onto the statement outcome taxonomy
pub fn classify_failure(err: &RemoteError) -> StatementOutcome {
    if err.is_already_exists() {
        StatementOutcome::Tolerated {
            reason: err.to_string(),
        }
    } else {
        StatementOutcome::Failed {
            reason: err.to_string(),
        }
    }
}

fn record(
    document: &str,
    statement: &Statement,
    outcome: StatementOutcome,
    fallback: Option<FallbackOutcome>,
) -> StatementRecord {
    StatementRecord {
        document: document.to_string(),
        ordinal: statement.ordinal,
        summary: statement.summary(),
        outcome,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_failure() {
        let conflict = RemoteError::api("exec_sql", 400, "type \"role\" already exists");
        assert!(matches!(
            classify_failure(&conflict),
            StatementOutcome::Tolerated { .. }
        ));

        let fatal = RemoteError::network("exec_sql", "connection reset");
        assert!(classify_failure(&fatal).is_failed());
    }
}
