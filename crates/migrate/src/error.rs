//! Error types for schema provisioning
//!
//! `RemoteError` covers a single call against the remote service and is
//! classified per statement; `MigrateError` covers the failures that end a
//! run before or outside the statement loop.

use std::path::PathBuf;

use thiserror::Error;

/// Substring that marks a remote failure as an idempotency conflict
pub const IDEMPOTENCY_SIGNATURE: &str = "already exists";

/// Result type alias for provisioning operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Result type alias for remote calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure of one call against the remote service
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{operation} failed with status {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: String, timeout_secs: u64 },

    #[error("Network error during {operation}: {message}")]
    Network { operation: String, message: String },

    #[error("Unexpected response from {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("Remote client configuration error: {message}")]
    Configuration { message: String },
}

impl RemoteError {
    pub fn api(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the failure says the target object is already there
    pub fn is_already_exists(&self) -> bool {
        self.to_string()
            .to_lowercase()
            .contains(IDEMPOTENCY_SIGNATURE)
    }
}

/// Errors that stop a provisioning run
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Failed to read schema file {}: {source}", .path.display())]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read manifest {}: {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },
}

impl MigrateError {
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            message: message.into(),
        }
    }
}
