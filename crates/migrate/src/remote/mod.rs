//! Remote service capability surface
//!
//! The provisioning run only ever needs four calls from the hosted backend.
//! They sit behind [`RemoteService`] so the executor and verifier can be
//! driven by the HTTP client in production and by fakes in tests.

pub mod rest;

pub use rest::{RestClient, RestClientOptions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::definitions::BucketSpec;
use crate::error::RemoteResult;

/// A storage bucket as reported by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

/// Operations the provisioning run consumes from the remote service
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Execute arbitrary SQL text through the RPC endpoint
    async fn exec_sql(&self, sql: &str) -> RemoteResult<()>;

    /// Create a storage bucket
    async fn create_bucket(&self, spec: &BucketSpec) -> RemoteResult<()>;

    /// List existing storage buckets
    async fn list_buckets(&self) -> RemoteResult<Vec<BucketInfo>>;

    /// Exact row count of a table
    async fn count_rows(&self, table: &str) -> RemoteResult<u64>;

    /// Get service name
    fn service_name(&self) -> &'static str;
}
