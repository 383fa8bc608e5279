use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mentorly_core::{ConfigSource, Credential, CredentialKind, ProvisionConfig};
use mentorly_migrate::{BucketSpec, RemoteError, RemoteService, RestClient, RestClientOptions};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Recorded {
    route: String,
    apikey: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct FakeBackend {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeBackend {
    fn record(&self, route: &str, headers: &HeaderMap, body: Value) {
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            route: route.to_string(),
            apikey: header_value("apikey"),
            authorization: header_value("authorization"),
            prefer: header_value("prefer"),
            body,
        });
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn exec_sql(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.record("exec_sql", &headers, body.clone());
    let sql = body["sql"].as_str().unwrap_or_default().to_string();

    if sql.contains("pg_sleep") {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    if sql.contains("profiles") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": "42P07",
                "details": null,
                "hint": null,
                "message": "relation \"profiles\" already exists"
            })),
        )
            .into_response();
    }
    (StatusCode::OK, Json(Value::Null)).into_response()
}

async fn list_buckets(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    backend.record("list_buckets", &headers, Value::Null);
    Json(json!([
        { "id": "blog-images", "name": "blog-images", "public": true, "owner": "" },
        { "id": "avatars", "name": "avatars", "public": false }
    ]))
    .into_response()
}

async fn create_bucket(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.record("create_bucket", &headers, body.clone());
    if body["name"] == "blog-images" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "statusCode": "409",
                "error": "Duplicate",
                "message": "The resource already exists"
            })),
        )
            .into_response();
    }
    Json(json!({ "name": body["name"] })).into_response()
}

async fn count_rows(
    State(backend): State<FakeBackend>,
    Path(table): Path<String>,
    headers: HeaderMap,
) -> Response {
    backend.record(&format!("count:{}", table), &headers, Value::Null);
    match table.as_str() {
        "blog_posts" => (StatusCode::OK, [(header::CONTENT_RANGE, "0-0/7")]).into_response(),
        "events" => (StatusCode::OK, [(header::CONTENT_RANGE, "*/0")]).into_response(),
        "no_range" => StatusCode::OK.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend() -> (String, FakeBackend) {
    let backend = FakeBackend::default();
    let app = Router::new()
        .route("/rest/v1/rpc/exec_sql", post(exec_sql))
        .route("/rest/v1/:table", get(count_rows))
        .route("/storage/v1/bucket", get(list_buckets).post(create_bucket))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), backend)
}

fn client(endpoint: &str, timeout: Duration) -> RestClient {
    let credential = Credential::new(
        CredentialKind::ServiceRole,
        "service-key",
        ConfigSource::Programmatic,
    );
    let config = ProvisionConfig::new(endpoint, credential).unwrap();
    RestClient::new(
        &config,
        RestClientOptions {
            timeout,
            ..RestClientOptions::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_exec_sql_posts_statement_with_auth_headers() {
    let (endpoint, backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    client.exec_sql("CREATE TABLE foo (id int)").await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].route, "exec_sql");
    assert_eq!(requests[0].apikey.as_deref(), Some("service-key"));
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer service-key")
    );
    assert_eq!(requests[0].body, json!({ "sql": "CREATE TABLE foo (id int)" }));
}

#[tokio::test]
async fn test_exec_sql_surfaces_postgrest_error_message() {
    let (endpoint, _backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    let err = client
        .exec_sql("CREATE TABLE profiles (id uuid)")
        .await
        .unwrap_err();

    match &err {
        RemoteError::Api {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, "exec_sql");
            assert_eq!(*status, 400);
            assert_eq!(message, "relation \"profiles\" already exists");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_exec_sql_times_out() {
    let (endpoint, _backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_millis(200));

    let err = client.exec_sql("SELECT pg_sleep(5)").await.unwrap_err();

    assert!(matches!(err, RemoteError::Timeout { .. }));
    assert!(!err.is_already_exists());
}

#[tokio::test]
async fn test_create_bucket_sends_full_configuration() {
    let (endpoint, backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    let spec = BucketSpec {
        name: "event-banners".to_string(),
        ..BucketSpec::default()
    };
    client.create_bucket(&spec).await.unwrap();

    let requests = backend.requests();
    assert_eq!(
        requests[0].body,
        json!({
            "id": "event-banners",
            "name": "event-banners",
            "public": true,
            "allowed_mime_types": ["image/png", "image/jpeg", "image/gif", "image/webp"],
            "file_size_limit": 5242880
        })
    );
}

#[tokio::test]
async fn test_create_bucket_minimal_omits_restrictions() {
    let (endpoint, backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    client
        .create_bucket(&BucketSpec::minimal("avatars-2"))
        .await
        .unwrap();

    assert_eq!(
        backend.requests()[0].body,
        json!({ "id": "avatars-2", "name": "avatars-2", "public": true })
    );
}

#[tokio::test]
async fn test_create_bucket_duplicate_is_already_exists() {
    let (endpoint, _backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    let err = client
        .create_bucket(&BucketSpec::default())
        .await
        .unwrap_err();

    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_list_buckets_decodes_listing() {
    let (endpoint, _backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    let buckets = client.list_buckets().await.unwrap();

    let names: Vec<_> = buckets.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["blog-images", "avatars"]);
    assert!(buckets[0].public);
    assert!(!buckets[1].public);
}

#[tokio::test]
async fn test_count_rows_reads_content_range() {
    let (endpoint, backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    assert_eq!(client.count_rows("blog_posts").await.unwrap(), 7);
    assert_eq!(client.count_rows("events").await.unwrap(), 0);

    let requests = backend.requests();
    assert_eq!(requests[0].route, "count:blog_posts");
    assert_eq!(requests[0].prefer.as_deref(), Some("count=exact"));
}

#[tokio::test]
async fn test_count_rows_errors() {
    let (endpoint, _backend) = spawn_backend().await;
    let client = client(&endpoint, Duration::from_secs(5));

    let missing = client.count_rows("mentors").await.unwrap_err();
    assert!(matches!(missing, RemoteError::Api { status: 404, .. }));

    let no_range = client.count_rows("no_range").await.unwrap_err();
    assert!(matches!(no_range, RemoteError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_service_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}", addr), Duration::from_secs(5));
    let err = client.exec_sql("SELECT 1").await.unwrap_err();

    assert!(matches!(err, RemoteError::Network { .. }));
}
