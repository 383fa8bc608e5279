//! Schema provisioning for the Mentorly backend
//!
//! A one-shot pipeline: schema files are split into statements, each
//! statement is sent to the remote service's SQL RPC in order, and the
//! expected tables and storage bucket are checked afterwards.

pub mod definitions;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod remote;
pub mod runner;
pub mod statements;
pub mod verify;

pub use definitions::{
    BucketCheck, BucketSpec, ExecutionReport, FailurePolicy, FallbackOutcome, ProvisionReport,
    SchemaDocument, SplitMode, Statement, StatementOutcome, StatementRecord, TableCheck,
    VerificationReport,
};
pub use error::{MigrateError, MigrateResult, RemoteError, RemoteResult, IDEMPOTENCY_SIGNATURE};
pub use executor::{ExecutorOptions, StatementExecutor};
pub use manifest::ProvisionManifest;
pub use remote::{BucketInfo, RemoteService, RestClient, RestClientOptions};
pub use runner::ProvisionRunner;
pub use verify::{Verifier, VerifyTargets};
