//! In-memory remote service used by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mentorly_migrate::{BucketInfo, BucketSpec, RemoteError, RemoteResult, RemoteService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ExecSql(String),
    CreateBucket(BucketSpec),
    ListBuckets,
    CountRows(String),
}

/// Scriptable fake that records every call in order
#[derive(Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<Call>>,
    sql_failures: Vec<(String, String)>,
    bucket_failure: Option<String>,
    listing_failure: Option<String>,
    buckets: Mutex<Vec<BucketInfo>>,
    tables: HashMap<String, u64>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements containing `pattern` fail with `message`
    pub fn fail_sql_containing(mut self, pattern: &str, message: &str) -> Self {
        self.sql_failures
            .push((pattern.to_string(), message.to_string()));
        self
    }

    pub fn fail_bucket_creation(mut self, message: &str) -> Self {
        self.bucket_failure = Some(message.to_string());
        self
    }

    pub fn fail_listing(mut self, message: &str) -> Self {
        self.listing_failure = Some(message.to_string());
        self
    }

    pub fn with_bucket(self, name: &str) -> Self {
        self.buckets.lock().unwrap().push(BucketInfo {
            id: name.to_string(),
            name: name.to_string(),
            public: true,
        });
        self
    }

    pub fn with_table(mut self, name: &str, rows: u64) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ExecSql(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn created_buckets(&self) -> Vec<BucketSpec> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateBucket(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn exec_sql(&self, sql: &str) -> RemoteResult<()> {
        self.record(Call::ExecSql(sql.to_string()));

        match self
            .sql_failures
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            Some((_, message)) => Err(RemoteError::api("exec_sql", 400, message.clone())),
            None => Ok(()),
        }
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> RemoteResult<()> {
        self.record(Call::CreateBucket(spec.clone()));

        if let Some(message) = &self.bucket_failure {
            return Err(RemoteError::api("create_bucket", 400, message.clone()));
        }

        let mut buckets = self.buckets.lock().unwrap();
        if buckets.iter().any(|b| b.id == spec.name) {
            return Err(RemoteError::api(
                "create_bucket",
                409,
                "The resource already exists",
            ));
        }
        buckets.push(BucketInfo {
            id: spec.name.clone(),
            name: spec.name.clone(),
            public: spec.public,
        });
        Ok(())
    }

    async fn list_buckets(&self) -> RemoteResult<Vec<BucketInfo>> {
        self.record(Call::ListBuckets);

        match &self.listing_failure {
            Some(message) => Err(RemoteError::network("list_buckets", message.clone())),
            None => Ok(self.buckets.lock().unwrap().clone()),
        }
    }

    async fn count_rows(&self, table: &str) -> RemoteResult<u64> {
        self.record(Call::CountRows(table.to_string()));

        self.tables.get(table).copied().ok_or_else(|| {
            RemoteError::api(
                "count_rows",
                404,
                format!("relation \"public.{}\" does not exist", table),
            )
        })
    }

    fn service_name(&self) -> &'static str {
        "fake"
    }
}
