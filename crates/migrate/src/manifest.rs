//! Provisioning manifest
//!
//! Optional YAML file describing what a run applies and verifies. Every
//! field has a default, so a missing manifest is equivalent to an empty one.
//!
//! ```yaml
//! schema_files:
//!   - database/create-tables.sql
//!   - database/schema.sql
//! split_mode: naive
//! failure_policy: continue_on_error
//! request_timeout_secs: 30
//! expected_tables: [blog_posts]
//! bucket:
//!   name: blog-images
//!   public: true
//!   allowed_mime_types: [image/png, image/jpeg]
//!   file_size_limit: 5242880
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::definitions::{BucketSpec, FailurePolicy, SplitMode};
use crate::error::{MigrateError, MigrateResult};
use crate::executor::ExecutorOptions;
use crate::verify::VerifyTargets;

/// Manifest looked up in the working directory when none is given
pub const DEFAULT_MANIFEST: &str = "provision.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionManifest {
    /// Schema files applied in order
    pub schema_files: Vec<PathBuf>,
    pub split_mode: SplitMode,
    pub failure_policy: FailurePolicy,
    /// Per-request timeout for remote calls
    pub request_timeout_secs: u64,
    /// Database function used to execute SQL text
    pub rpc_function: String,
    /// Tables whose existence is checked after the run
    pub expected_tables: Vec<String>,
    /// Bucket used for the fallback path and checked after the run
    pub bucket: Option<BucketSpec>,
}

impl Default for ProvisionManifest {
    fn default() -> Self {
        Self {
            schema_files: vec![PathBuf::from("database/schema.sql")],
            split_mode: SplitMode::default(),
            failure_policy: FailurePolicy::default(),
            request_timeout_secs: 30,
            rpc_function: "exec_sql".to_string(),
            expected_tables: vec!["blog_posts".to_string()],
            bucket: Some(BucketSpec::default()),
        }
    }
}

impl ProvisionManifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> MigrateResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| MigrateError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest: Self =
            serde_yaml::from_str(&content).map_err(|source| MigrateError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Load an explicitly named manifest, or the default one if present.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// manifest just yields the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> MigrateResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_MANIFEST);
                if default_path.exists() {
                    tracing::debug!("Using manifest {}", DEFAULT_MANIFEST);
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> MigrateResult<()> {
        if self.schema_files.is_empty() {
            return Err(MigrateError::invalid_manifest(
                "schema_files must list at least one file",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(MigrateError::invalid_manifest(
                "request_timeout_secs must be greater than zero",
            ));
        }
        if self.rpc_function.trim().is_empty() {
            return Err(MigrateError::invalid_manifest("rpc_function must not be empty"));
        }
        if let Some(bucket) = &self.bucket {
            if bucket.name.trim().is_empty() {
                return Err(MigrateError::invalid_manifest("bucket.name must not be empty"));
            }
        }
        if self.expected_tables.iter().any(|t| t.trim().is_empty()) {
            return Err(MigrateError::invalid_manifest(
                "expected_tables must not contain empty names",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            policy: self.failure_policy,
            fallback_bucket: self.bucket.clone(),
        }
    }

    pub fn verify_targets(&self) -> VerifyTargets {
        VerifyTargets {
            tables: self.expected_tables.clone(),
            bucket: self.bucket.as_ref().map(|b| b.name.clone()),
        }
    }
}
