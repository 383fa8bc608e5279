//! Provisioning Definitions - Core types shared by the extractor, executor and verifier
//!
//! Defines the statement and document types produced from schema files, the
//! per-statement outcome taxonomy and the reports a run produces.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static STORAGE_BUCKETS_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"?storage"?\s*\.\s*"?buckets"?"#).expect("storage bucket pattern is valid")
});

/// One executable statement extracted from a schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based position within its document
    pub ordinal: usize,
    /// Statement text, trimmed, without the terminator
    pub sql: String,
}

impl Statement {
    pub fn new(ordinal: usize, sql: impl Into<String>) -> Self {
        Self {
            ordinal,
            sql: sql.into(),
        }
    }

    /// Whether the statement touches the `storage.buckets` table
    pub fn references_storage_bucket(&self) -> bool {
        STORAGE_BUCKETS_REF.is_match(&self.sql)
    }

    /// Single-line preview for log output
    pub fn summary(&self) -> String {
        const MAX_CHARS: usize = 72;

        let collapsed = self.sql.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= MAX_CHARS {
            collapsed
        } else {
            let head: String = collapsed.chars().take(MAX_CHARS).collect();
            format!("{}...", head)
        }
    }
}

/// Ordered statements read from one schema file
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Where the text came from, `None` for inline text
    pub source: Option<PathBuf>,
    pub statements: Vec<Statement>,
}

impl SchemaDocument {
    pub fn label(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<inline>".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// How schema text is split into statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Split on every `;`, ignoring quoting
    #[default]
    Naive,
    /// Parse with a SQL parser, falling back to naive splitting on parse errors
    Parsed,
}

/// What the executor does after a statement fails for a non-idempotency reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch; remaining statements are reported as skipped
    #[serde(alias = "abort")]
    AbortOnError,
    /// Log the failure and move on to the next statement
    #[default]
    #[serde(alias = "continue")]
    ContinueOnError,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "abort" | "abort_on_error" => Ok(FailurePolicy::AbortOnError),
            "continue" | "continue_on_error" => Ok(FailurePolicy::ContinueOnError),
            other => Err(format!(
                "unknown failure policy '{}', expected 'abort' or 'continue'",
                other
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AbortOnError => write!(f, "abort-on-error"),
            FailurePolicy::ContinueOnError => write!(f, "continue-on-error"),
        }
    }
}

/// Storage bucket to provision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
    /// Upload ceiling in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<u64>,
}

impl BucketSpec {
    /// Public bucket with no type or size restrictions
    pub fn minimal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: true,
            allowed_mime_types: None,
            file_size_limit: None,
        }
    }
}

impl Default for BucketSpec {
    fn default() -> Self {
        Self {
            name: "blog-images".to_string(),
            public: true,
            allowed_mime_types: Some(vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ]),
            file_size_limit: Some(5 * 1024 * 1024),
        }
    }
}

/// Result of issuing one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    Applied,
    /// Failed, but in a way that is safe to ignore
    Tolerated { reason: String },
    Failed { reason: String },
    /// Not attempted because an earlier failure aborted the batch
    Skipped,
}

impl StatementOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StatementOutcome::Failed { .. })
    }
}

/// Result of the direct bucket-creation fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    Created,
    AlreadyExists,
    Failed { reason: String },
}

/// Outcome of one statement, with enough context to report it
#[derive(Debug, Clone)]
pub struct StatementRecord {
    pub document: String,
    pub ordinal: usize,
    pub summary: String,
    pub outcome: StatementOutcome,
    pub fallback: Option<FallbackOutcome>,
}

/// Outcomes of the statement loop, in execution order
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub records: Vec<StatementRecord>,
    /// Set when `FailurePolicy::AbortOnError` stopped the batch
    pub aborted: bool,
}

impl ExecutionReport {
    fn count(&self, pred: impl Fn(&StatementOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, StatementOutcome::Applied))
    }

    pub fn tolerated(&self) -> usize {
        self.count(|o| matches!(o, StatementOutcome::Tolerated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(StatementOutcome::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StatementOutcome::Skipped))
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }
}

/// Existence check of an expected table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCheck {
    Present { rows: u64 },
    Missing { reason: String },
}

/// Existence check of the expected storage bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketCheck {
    Present,
    /// Absent from the listing and created by remediation
    Created,
    Missing { reason: String },
}

/// Results of the post-run verification queries
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub tables: Vec<(String, TableCheck)>,
    pub bucket: Option<(String, BucketCheck)>,
}

impl VerificationReport {
    /// Number of expected objects that are still absent
    pub fn missing(&self) -> usize {
        let tables = self
            .tables
            .iter()
            .filter(|(_, check)| matches!(check, TableCheck::Missing { .. }))
            .count();
        let bucket = usize::from(matches!(self.bucket, Some((_, BucketCheck::Missing { .. }))));
        tables + bucket
    }

    /// True when every expected object exists (or was created)
    pub fn is_clean(&self) -> bool {
        self.missing() == 0
    }
}

/// Everything a provisioning run did
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub started_at: DateTime<Utc>,
    pub execution: ExecutionReport,
    pub verification: VerificationReport,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl ProvisionReport {
    /// Whether any statement failed or any expected object is missing
    pub fn has_failures(&self) -> bool {
        self.execution.failed() > 0 || self.execution.aborted || !self.verification.is_clean()
    }
}
