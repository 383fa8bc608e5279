//! Shared foundation for the Mentorly provisioning tools.
//!
//! Holds the connection configuration resolved from the environment, the
//! core error type and the logging bootstrap used by the CLI.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConfigSource, Credential, CredentialKind, ProvisionConfig};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, LoggingConfig};
