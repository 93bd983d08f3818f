use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use turso_pipeline::{
    ClientConfig, PipelineEnvelope, Statement, StatementOutcome, TursoClient, TursoError, Value,
};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: JsonValue,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body,
            delay: Duration::from_millis(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct CapturedRequest {
    authorization: Option<String>,
    content_type: Option<String>,
    body: JsonValue,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    hits: Arc<AtomicUsize>,
}

async fn pipeline_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(CapturedRequest {
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
            body: serde_json::from_str(&body).unwrap_or(JsonValue::Null),
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, Json(response.body))
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn client(&self, max_retries: usize, backoff: Duration, timeout: Duration) -> TursoClient {
        let config = ClientConfig::builder()
            .database_url(&self.base_url)
            .auth_token("token")
            .max_retries(max_retries)
            .backoff_base(backoff)
            .timeout(timeout)
            .build_with(|_| None)
            .expect("config must build");
        TursoClient::new(config).expect("client must build")
    }

    fn default_client(&self) -> TursoClient {
        self.client(0, Duration::ZERO, Duration::from_secs(5))
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/v2/pipeline", post(pipeline_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        requests: state.requests,
        task,
    }
}

fn close_result() -> JsonValue {
    json!({"type": "ok", "response": {"type": "close"}})
}

fn query_pipeline_body() -> JsonValue {
    json!({
        "results": [
            {
                "type": "ok",
                "response": {
                    "type": "execute",
                    "result": {
                        "cols": [
                            { "name": "id", "decltype": "INTEGER" },
                            { "name": "name", "decltype": "TEXT" }
                        ],
                        "rows": [
                            [
                                { "type": "integer", "value": "1" },
                                { "type": "text", "value": "Kit" }
                            ]
                        ],
                        "affected_row_count": 0
                    }
                }
            },
            close_result()
        ]
    })
}

#[tokio::test]
async fn select_one_without_columns_normalizes_rows() {
    let body = json!({
        "results": [
            {
                "type": "ok",
                "response": {
                    "type": "execute",
                    "result": { "rows": [[{ "type": "integer", "value": "1" }]] }
                }
            },
            close_result()
        ]
    });
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, body)]).await;
    let db = server.default_client();

    let envelope =
        PipelineEnvelope::build([Statement::new("SELECT 1", ())]).expect("must build envelope");
    let raw = db.send_pipeline(&envelope).await.expect("send must succeed");
    let result = raw.normalize();

    assert!(result.columns().is_empty());
    assert_eq!(result.rows(), [vec![json!("1")]]);
    assert_eq!(result.count(), 1);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn execute_sends_envelope_with_bearer_and_close() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        query_pipeline_body(),
    )])
    .await;
    let db = server.default_client();

    let result = db
        .execute(
            "SELECT id, name FROM users WHERE name = ? AND active = ?",
            [Value::text("Kit"), Value::from(true)],
        )
        .await
        .expect("execute must succeed");

    assert_eq!(result.columns(), ["id", "name"]);
    assert_eq!(result.count(), 1);
    let row = result.row(0).expect("row exists");
    assert_eq!(row.get_i64("id"), Some(1));
    assert_eq!(row.get_str("name"), Some("Kit"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer token"));
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        requests[0].body,
        json!({
            "requests": [
                {
                    "type": "execute",
                    "stmt": {
                        "sql": "SELECT id, name FROM users WHERE name = ? AND active = ?",
                        "args": [
                            { "type": "text", "value": "Kit" },
                            { "type": "integer", "value": "1" }
                        ]
                    }
                },
                { "type": "close" }
            ]
        })
    );
}

#[tokio::test]
async fn execute_surfaces_statement_error_as_application_error() {
    let body = json!({
        "results": [
            {
                "type": "error",
                "error": {
                    "message": "FOREIGN KEY constraint failed",
                    "code": "SQLITE_CONSTRAINT"
                }
            },
            close_result()
        ]
    });
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, body)]).await;
    let db = server.client(3, Duration::ZERO, Duration::from_secs(5));

    let err = db
        .execute("INSERT INTO tokens (uid) VALUES (?)", [Value::text("nobody")])
        .await
        .expect_err("execute must fail");

    match err {
        TursoError::Application {
            request_index,
            message,
            code,
        } => {
            assert_eq!(request_index, 0);
            assert!(message.contains("FOREIGN KEY"));
            assert_eq!(code.as_deref(), Some("SQLITE_CONSTRAINT"));
        }
        other => panic!("expected application error, got {other:?}"),
    }
    assert_eq!(server.hits(), 1, "application errors are not retried");
}

#[tokio::test]
async fn execute_raw_returns_body_even_with_statement_error() {
    let body = json!({
        "results": [
            { "type": "error", "error": { "message": "no such table: users" } },
            close_result()
        ]
    });
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, body.clone())]).await;
    let db = server.default_client();

    let raw = db
        .execute_raw("SELECT * FROM users", ())
        .await
        .expect("raw execute must succeed");

    assert_eq!(raw.as_json(), &body);
    assert_eq!(raw.row_count(), 0);
    assert!(raw.application_error(1).is_some());
}

#[tokio::test]
async fn pipeline_reports_statement_level_errors_without_failing() {
    let body = json!({
        "results": [
            {
                "type": "ok",
                "response": {
                    "type": "execute",
                    "result": { "affected_row_count": 1, "last_insert_rowid": "1" }
                }
            },
            {
                "type": "error",
                "error": {
                    "message": "near \"INSER\": syntax error",
                    "code": "SQLITE_ERROR"
                }
            },
            {
                "type": "ok",
                "response": {
                    "type": "execute",
                    "result": {
                        "cols": [{ "name": "cnt", "decltype": "INTEGER" }],
                        "rows": [[{ "type": "integer", "value": "1" }]]
                    }
                }
            },
            close_result()
        ]
    });
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, body)]).await;
    let db = server.default_client();

    let outcomes = db
        .execute_pipeline([
            Statement::new("INSERT INTO users(name) VALUES (?)", [Value::text("A")]),
            Statement::new("INSER INTO users(name) VALUES (?)", [Value::text("B")]),
            Statement::new("SELECT COUNT(*) AS cnt FROM users", ()),
        ])
        .await
        .expect("pipeline must succeed with per-statement errors");

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(&outcomes[0], StatementOutcome::Rows(result) if result.is_empty()));
    assert!(matches!(
        outcomes[1],
        StatementOutcome::SqlError {
            request_index: 1,
            ..
        }
    ));
    match &outcomes[2] {
        StatementOutcome::Rows(result) => {
            assert_eq!(result.columns(), ["cnt"]);
            assert_eq!(result.first_value(), Some(&json!("1")));
        }
        other => panic!("expected rows, got {other:?}"),
    }

    let requests = server.requests();
    let sent = requests[0].body["requests"]
        .as_array()
        .expect("requests array");
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3], json!({ "type": "close" }));
}

#[tokio::test]
async fn pipeline_statements_share_one_request_in_order() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({ "results": [] }),
    )])
    .await;
    let db = server.default_client();

    db.execute_pipeline([
        Statement::from("PRAGMA foreign_keys = OFF"),
        Statement::new("INSERT INTO t (a) VALUES (?)", [Value::integer(1)]),
        Statement::new("INSERT INTO t (a) VALUES (?)", [Value::integer(2)]),
    ])
    .await
    .expect("pipeline must succeed");

    assert_eq!(server.hits(), 1);
    let requests = server.requests();
    let sql: Vec<&str> = requests[0].body["requests"]
        .as_array()
        .expect("requests array")
        .iter()
        .filter_map(|request| request["stmt"]["sql"].as_str())
        .collect();
    assert_eq!(
        sql,
        [
            "PRAGMA foreign_keys = OFF",
            "INSERT INTO t (a) VALUES (?)",
            "INSERT INTO t (a) VALUES (?)"
        ]
    );
}

#[tokio::test]
async fn ping_sends_close_only() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({ "results": [close_result()] }),
    )])
    .await;
    let db = server.default_client();

    db.ping().await.expect("ping must succeed");

    assert_eq!(
        server.requests()[0].body,
        json!({ "requests": [{ "type": "close" }] })
    );
}

#[tokio::test]
async fn retries_on_server_error_then_succeeds() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
        MockResponse::json(StatusCode::OK, query_pipeline_body()),
    ])
    .await;
    let db = server.client(1, Duration::from_millis(1), Duration::from_secs(5));

    let result = db
        .execute("SELECT id, name FROM users", ())
        .await
        .expect("request must succeed after retry");

    assert_eq!(result.count(), 1);
    assert_eq!(server.hits(), 2);
    let requests = server.requests();
    assert_eq!(requests[0].body, requests[1].body, "retry resends the same envelope");
}

#[tokio::test]
async fn repeated_server_error_fails_after_initial_plus_retries() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
    ])
    .await;
    let db = server.client(1, Duration::ZERO, Duration::from_secs(5));

    let err = db
        .execute("SELECT 1", ())
        .await
        .expect_err("request must fail");

    match err {
        TursoError::Transport { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::BAD_REQUEST,
        json!({"error": "SQL parse error"}),
    )])
    .await;
    let db = server.client(3, Duration::ZERO, Duration::from_secs(5));

    let err = db
        .execute("SELEC 1", ())
        .await
        .expect_err("request must fail");

    assert!(matches!(err, TursoError::Transport { status: 400, .. }));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn first_attempt_success_does_not_wait_for_backoff() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        query_pipeline_body(),
    )])
    .await;
    let db = server.client(3, Duration::from_secs(60), Duration::from_secs(120));

    let started = Instant::now();
    db.execute("SELECT id, name FROM users", ())
        .await
        .expect("execute must succeed");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn round_trip_timeout_surfaces_timeout_error() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        query_pipeline_body(),
    )
    .with_delay(Duration::from_millis(500))])
    .await;
    let db = server.client(0, Duration::ZERO, Duration::from_millis(50));

    let err = db
        .execute("SELECT 1", ())
        .await
        .expect_err("request must time out");

    assert!(matches!(err, TursoError::Timeout { .. }));
}

#[tokio::test]
async fn timeout_covers_backoff_sleeps() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "busy"})),
        MockResponse::json(StatusCode::OK, query_pipeline_body()),
    ])
    .await;
    let db = server.client(3, Duration::from_secs(10), Duration::from_millis(200));

    let err = db
        .execute("SELECT 1", ())
        .await
        .expect_err("backoff must exceed the budget");

    assert!(matches!(err, TursoError::Timeout { .. }));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn unsupported_argument_fails_before_sending() {
    let server = spawn_server(vec![]).await;
    let db = server.default_client();

    let err = db
        .execute("SELECT ?", [Value::float(f64::NAN)])
        .await
        .expect_err("encoding must fail");

    assert!(matches!(err, TursoError::UnsupportedArgumentType { .. }));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn unreachable_endpoint_surfaces_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);

    let config = ClientConfig::builder()
        .database_url(format!("http://{address}"))
        .auth_token("token")
        .max_retries(2)
        .backoff_base(Duration::ZERO)
        .timeout(Duration::from_secs(5))
        .build_with(|_| None)
        .expect("config must build");
    let db = TursoClient::new(config).expect("client must build");

    let err = db
        .execute("SELECT 1", ())
        .await
        .expect_err("connection must fail");

    assert!(matches!(err, TursoError::Connection(_)));
}

#[tokio::test]
async fn refused_connection_is_retried_with_backoff() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);

    let config = ClientConfig::builder()
        .database_url(format!("http://{address}"))
        .auth_token("token")
        .max_retries(2)
        .backoff_base(Duration::from_millis(200))
        .timeout(Duration::from_secs(10))
        .build_with(|_| None)
        .expect("config must build");
    let db = TursoClient::new(config).expect("client must build");

    let started = Instant::now();
    let err = db
        .execute("SELECT 1", ())
        .await
        .expect_err("connection must fail");

    assert!(matches!(err, TursoError::Connection(_)));
    assert!(
        started.elapsed() >= Duration::from_millis(600),
        "two backoff sleeps of 200ms and 400ms precede the final failure"
    );
}

#[tokio::test]
async fn execute_ignores_error_reported_by_close() {
    let body = json!({
        "results": [
            {
                "type": "ok",
                "response": {
                    "type": "execute",
                    "result": { "rows": [[{ "type": "integer", "value": "1" }]] }
                }
            },
            { "type": "error", "error": { "message": "close failed" } }
        ]
    });
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, body.clone()),
        MockResponse::json(StatusCode::OK, body),
    ])
    .await;
    let db = server.default_client();

    let result = db
        .execute("SELECT 1", ())
        .await
        .expect("statement succeeded, so execute must succeed");
    assert_eq!(result.rows(), [vec![json!("1")]]);

    let outcomes = db
        .execute_pipeline([Statement::from("SELECT 1")])
        .await
        .expect("pipeline must succeed");
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].is_error());
    assert_eq!(server.hits(), 2);
}
