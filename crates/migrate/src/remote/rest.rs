//! HTTP client for the hosted backend (PostgREST RPC + storage API)

use std::time::Duration;

use async_trait::async_trait;
use mentorly_core::ProvisionConfig;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_RANGE},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{BucketInfo, RemoteService};
use crate::definitions::BucketSpec;
use crate::error::{RemoteError, RemoteResult};

/// Tunables for [`RestClient`]
#[derive(Debug, Clone)]
pub struct RestClientOptions {
    /// Applied to every request, connect through body
    pub timeout: Duration,
    /// Name of the database function that executes SQL text
    pub rpc_function: String,
}

impl Default for RestClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            rpc_function: "exec_sql".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateBucketRequest<'a> {
    id: &'a str,
    name: &'a str,
    public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_mime_types: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_size_limit: Option<u64>,
}

/// Remote service client using reqwest
#[derive(Clone)]
pub struct RestClient {
    endpoint: Url,
    api_key: String,
    client: Client,
    options: RestClientOptions,
}

impl RestClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &ProvisionConfig, options: RestClientOptions) -> RemoteResult<Self> {
        if config.endpoint().cannot_be_a_base() {
            return Err(RemoteError::configuration(format!(
                "Service URL {} cannot be used as a base",
                config.endpoint()
            )));
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| RemoteError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint().clone(),
            api_key: config.credential().key().to_string(),
            client,
            options,
        })
    }

    /// Endpoint URL with the given path segments appended
    fn url(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RemoteError::configuration(format!(
                    "Service URL {} cannot be used as a base",
                    self.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::api(
            operation,
            status.as_u16(),
            extract_error_message(status, &body),
        ))
    }

    fn transport_error(&self, operation: &str, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout {
                operation: operation.to_string(),
                timeout_secs: self.options.timeout.as_secs(),
            }
        } else if err.is_decode() {
            RemoteError::decode(operation, err.to_string())
        } else {
            RemoteError::network(operation, err.to_string())
        }
    }
}

#[async_trait]
impl RemoteService for RestClient {
    async fn exec_sql(&self, sql: &str) -> RemoteResult<()> {
        let url = self.url(&["rest", "v1", "rpc", self.options.rpc_function.as_str()])?;
        debug!("POST {} ({} bytes of SQL)", url, sql.len());

        let request = self.request(Method::POST, url).json(&json!({ "sql": sql }));
        self.send("exec_sql", request).await?;
        Ok(())
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> RemoteResult<()> {
        let url = self.url(&["storage", "v1", "bucket"])?;
        debug!("POST {} (bucket '{}')", url, spec.name);

        let body = CreateBucketRequest {
            id: &spec.name,
            name: &spec.name,
            public: spec.public,
            allowed_mime_types: spec.allowed_mime_types.as_deref(),
            file_size_limit: spec.file_size_limit,
        };
        let request = self.request(Method::POST, url).json(&body);
        self.send("create_bucket", request).await?;
        Ok(())
    }

    async fn list_buckets(&self) -> RemoteResult<Vec<BucketInfo>> {
        let url = self.url(&["storage", "v1", "bucket"])?;
        debug!("GET {}", url);

        let response = self
            .send("list_buckets", self.request(Method::GET, url))
            .await?;
        response
            .json::<Vec<BucketInfo>>()
            .await
            .map_err(|e| self.transport_error("list_buckets", e))
    }

    async fn count_rows(&self, table: &str) -> RemoteResult<u64> {
        let mut url = self.url(&["rest", "v1", table])?;
        url.query_pairs_mut().append_pair("select", "*");
        debug!("HEAD {}", url);

        let request = self
            .request(Method::HEAD, url)
            .header("Prefer", "count=exact");
        let response = self.send("count_rows", request).await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RemoteError::decode("count_rows", "response has no Content-Range header"))?;

        parse_content_range_total(range).ok_or_else(|| {
            RemoteError::decode(
                "count_rows",
                format!("cannot read row count from Content-Range '{}'", range),
            )
        })
    }

    fn service_name(&self) -> &'static str {
        "rest"
    }
}

/// Total from a PostgREST `Content-Range` value such as `0-9/42` or `*/0`
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().split_once('/')?;
    total.trim().parse().ok()
}

/// Pull a human-readable message out of an error response body
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "msg"] {
            if let Some(Value::String(message)) = fields.get(key) {
                if !message.trim().is_empty() {
                    return message.clone();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.to_string()
    }
}
