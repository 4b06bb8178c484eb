//! Tests for the Livy module

use super::*;
use crate::config::BasicCredentials;
use crate::error::Error;
use crate::types::{IfExists, JsonValue, TlsVerify};
use arrow::array::{Array, BooleanArray, Float64Array, Int64Array, StringArray};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> LivyClient {
    LivyClient::new(
        server.uri(),
        BasicCredentials::new("user", "pass"),
        TlsVerify::Enabled,
    )
    .unwrap()
}

fn fast_polling(max_ms: u64) -> PollingConfig {
    PollingConfig::fixed(
        Duration::from_millis(10),
        Some(Duration::from_millis(max_ms)),
    )
}

fn session_json(id: i64, state: &str) -> JsonValue {
    json!({"id": id, "name": "test", "state": state, "kind": "pyspark", "appId": null})
}

async fn mount_create(server: &MockServer, id: i64) {
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_json(id, "not_started")))
        .mount(server)
        .await;
}

async fn mount_state(server: &MockServer, id: i64, state: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/sessions/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(id, state)))
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer, id: i64, expected: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("/sessions/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "deleted"})))
        .expect(expected)
        .mount(server)
        .await;
}

async fn ready_session(server: &MockServer) -> LivySession {
    mount_create(server, 0).await;
    mount_state(server, 0, "idle").await;
    LivySession::start(
        client_for(server),
        &SessionRequest::new("test"),
        fast_polling(500),
    )
    .await
    .unwrap()
}

async fn mount_statement(server: &MockServer, output: JsonValue) {
    Mock::given(method("POST"))
        .and(path("/sessions/0/statements"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 0, "code": "", "state": "waiting", "output": null})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/0/statements/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 0,
            "code": "",
            "state": "available",
            "progress": 1.0,
            "output": output,
        })))
        .mount(server)
        .await;
}

// Session state model

#[test]
fn test_state_sets() {
    assert!(SessionState::NotStarted.is_not_ready());
    assert!(SessionState::Starting.is_not_ready());
    assert!(SessionState::Idle.is_active());
    assert!(SessionState::Busy.is_active());
    assert!(SessionState::ShuttingDown.is_active());
    for state in FINISHED {
        assert!(state.is_finished());
        assert!(!state.is_active());
    }
    assert!(NOT_READY.iter().all(|s| !FINISHED.contains(s)));
}

#[test]
fn test_session_from_json() {
    let session = Session::from_json(&json!({
        "id": 4, "state": "shutting_down", "appId": "application_1", "kind": "spark"
    }))
    .unwrap();
    assert_eq!(session.id, 4);
    assert_eq!(session.state, SessionState::ShuttingDown);
    assert_eq!(session.app_id.as_deref(), Some("application_1"));
    assert_eq!(session.kind, Some(SessionKind::Spark));

    let err = Session::from_json(&json!({"id": 4, "state": "exploded"})).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_session_request_serialization() {
    let request = SessionRequest::new("etl")
        .kind(SessionKind::Pyspark)
        .num_executors(2)
        .py_file("s3://bucket/job.py")
        .conf("spark.executor.memory", "2g");

    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({
            "name": "etl",
            "kind": "pyspark",
            "numExecutors": 2,
            "pyFiles": ["s3://bucket/job.py"],
            "conf": {"spark.executor.memory": "2g"}
        })
    );

    assert_eq!(
        serde_json::to_value(SessionRequest::new("bare")).unwrap(),
        json!({"name": "bare"})
    );
}

// Polling schedule

#[test]
fn test_default_schedule_sequence() {
    let intervals: Vec<f64> = PollingSchedule::default()
        .take(7)
        .map(|d| d.as_secs_f64())
        .collect();
    assert_eq!(intervals, vec![0.1, 0.2, 0.3, 0.5, 1.0, 1.0, 1.0]);
}

#[test]
fn test_bounded_schedule_stops_after_exceeding_max() {
    let schedule = PollingConfig::bounded(Duration::from_secs(1))
        .schedule()
        .unwrap();
    let intervals: Vec<Duration> = schedule.collect();
    // the running total reaches 1.1s on the last interval
    assert_eq!(
        intervals,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300),
            Duration::from_millis(500),
        ]
    );
}

#[test]
fn test_schedule_tracks_elapsed() {
    let mut schedule = PollingSchedule::new(
        vec![Duration::from_millis(100)],
        Duration::from_millis(250),
        Some(Duration::from_millis(600)),
    );
    assert_eq!(schedule.next(), Some(Duration::from_millis(100)));
    assert_eq!(schedule.next(), Some(Duration::from_millis(250)));
    assert_eq!(schedule.next(), Some(Duration::from_millis(250)));
    // 600ms does not exceed the bound yet
    assert_eq!(schedule.next(), Some(Duration::from_millis(250)));
    assert_eq!(schedule.next(), None);
    assert_eq!(schedule.next(), None);
    assert_eq!(schedule.elapsed(), Duration::from_millis(850));
}

#[test_case(PollingConfig { rest_secs: 0.0, ..PollingConfig::default() } ; "zero rest")]
#[test_case(PollingConfig { rest_secs: -1.0, ..PollingConfig::default() } ; "negative rest")]
#[test_case(PollingConfig { warmup_secs: vec![f64::NAN], ..PollingConfig::default() } ; "nan warmup")]
#[test_case(PollingConfig { max_duration_secs: Some(-5.0), ..PollingConfig::default() } ; "negative max")]
fn test_invalid_polling_config(config: PollingConfig) {
    let err = config.schedule().unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[test]
fn test_polling_config_from_yaml() {
    let config: PollingConfig = serde_yaml::from_str("rest_secs: 2.5\nmax_duration_secs: 60").unwrap();
    assert_eq!(config.warmup_secs, vec![0.1, 0.2, 0.3, 0.5]);
    assert_eq!(config.rest_secs, 2.5);
    assert_eq!(config.max_duration_secs, Some(60.0));
}

// Transport client

#[tokio::test]
async fn test_client_sends_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.8.0"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.server_version().await.unwrap(), "0.8.0");

    let debug = format!("{client:?}");
    assert!(debug.contains("\"user\""));
    assert!(!debug.contains("pass"));
}

#[tokio::test]
async fn test_client_status_error_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server).get("sessions", None).await.unwrap_err();
    assert!(err.is_transport());
    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_client_empty_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions/1/statements/2/cancel"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value = client
        .post("/sessions/1/statements/2/cancel", None)
        .await
        .unwrap();
    assert!(value.is_null());
    client.cancel_statement(1, 2).await.unwrap();
}

#[tokio::test]
async fn test_list_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "from": 0,
            "total": 2,
            "sessions": [session_json(1, "idle"), session_json(2, "dead")]
        })))
        .mount(&server)
        .await;

    let sessions = client_for(&server).list_sessions().await.unwrap();
    let states: Vec<SessionState> = sessions.iter().map(|s| s.state).collect();
    assert_eq!(states, vec![SessionState::Idle, SessionState::Dead]);
}

#[tokio::test]
async fn test_closed_client_rejects_requests() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    assert!(client.is_managed());

    client.close();
    assert!(client.is_closed());
    let err = client.get("/version", None).await.unwrap_err();
    assert!(matches!(err, Error::ClientClosed));
}

#[tokio::test]
async fn test_external_client_is_not_closed() {
    let server = MockServer::start().await;
    let mut client = LivyClient::with_http_client(
        server.uri(),
        BasicCredentials::new("user", "pass"),
        reqwest::Client::new(),
    );
    assert!(!client.is_managed());

    client.close();
    assert!(!client.is_closed());
}

#[test]
fn test_client_from_credentials_requires_password() {
    let mapping = json!({"username": "user"});
    let err = LivyClient::from_credentials(
        "http://livy:8998",
        mapping.as_object().unwrap(),
        TlsVerify::Enabled,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Credential { .. }));
}

// Lifecycle

#[tokio::test]
async fn test_create_posts_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .and(body_json(json!({"name": "etl", "kind": "pyspark", "numExecutors": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_json(7, "starting")))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 7, 1).await;

    let request = SessionRequest::new("etl")
        .kind(SessionKind::Pyspark)
        .num_executors(2);
    let mut session = LivySession::create(client_for(&server), &request, fast_polling(100))
        .await
        .unwrap();
    assert_eq!(session.id(), 7);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_create_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid kind"))
        .mount(&server)
        .await;

    let err = LivySession::create(
        client_for(&server),
        &SessionRequest::new("bad"),
        fast_polling(100),
    )
    .await
    .unwrap_err();
    match err {
        Error::SessionCreation { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid kind"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_unreachable_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client =
        LivyClient::new(url, BasicCredentials::new("user", "pass"), TlsVerify::Enabled).unwrap();
    let err = LivySession::create(client, &SessionRequest::new("x"), fast_polling(100))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, Error::Http(_)));
}

#[tokio::test]
async fn test_wait_until_ready() {
    let server = MockServer::start().await;
    mount_create(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/sessions/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(0, "not_started")))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(0, "starting")))
        .up_to_n_times(2)
        .with_priority(2)
        .mount(&server)
        .await;
    mount_state(&server, 0, "idle").await;
    mount_delete(&server, 0, 1).await;

    let mut session = LivySession::create(
        client_for(&server),
        &SessionRequest::new("test"),
        fast_polling(1000),
    )
    .await
    .unwrap();

    assert_eq!(session.wait().await.unwrap(), SessionState::Idle);
    assert_eq!(session.state().await.unwrap(), SessionState::Idle);
    session.close().await.unwrap();
}

fn slow_polling() -> PollingConfig {
    PollingConfig::fixed(Duration::from_secs(60), None)
}

#[test_case("recovering", SessionState::Recovering ; "recovering")]
#[test_case("idle", SessionState::Idle ; "idle")]
#[test_case("running", SessionState::Running ; "running")]
#[test_case("busy", SessionState::Busy ; "busy")]
#[test_case("shutting_down", SessionState::ShuttingDown ; "shutting down")]
#[tokio::test]
async fn test_wait_returns_on_first_active_state(remote: &str, expected: SessionState) {
    let server = MockServer::start().await;
    mount_create(&server, 8).await;
    Mock::given(method("GET"))
        .and(path("/sessions/8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(8, remote)))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 8, 1).await;

    let mut session = LivySession::create(
        client_for(&server),
        &SessionRequest::new("test"),
        slow_polling(),
    )
    .await
    .unwrap();

    // a single sleep would take a minute
    let state = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .expect("wait slept after an active state")
        .unwrap();
    assert_eq!(state, expected);
    session.close().await.unwrap();
}

#[test_case("error" ; "error")]
#[test_case("dead" ; "dead")]
#[test_case("killed" ; "killed")]
#[test_case("success" ; "success")]
#[tokio::test]
async fn test_wait_fails_on_first_finished_state(remote: &str) {
    let server = MockServer::start().await;
    mount_create(&server, 9).await;
    Mock::given(method("GET"))
        .and(path("/sessions/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(9, remote)))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 9, 1).await;

    let mut session = LivySession::create(
        client_for(&server),
        &SessionRequest::new("test"),
        slow_polling(),
    )
    .await
    .unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .expect("wait slept after a finished state")
        .unwrap_err();
    match err {
        Error::SessionFailedToStart { id, state } => {
            assert_eq!(id, 9);
            assert_eq!(state, remote);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_wait_on_finished_session() {
    let server = MockServer::start().await;
    mount_create(&server, 3).await;
    mount_state(&server, 3, "dead").await;

    let mut session = LivySession::create(
        client_for(&server),
        &SessionRequest::new("test"),
        fast_polling(500),
    )
    .await
    .unwrap();

    let err = session.wait().await.unwrap_err();
    match err {
        Error::SessionFailedToStart { id, state } => {
            assert_eq!(id, 3);
            assert_eq!(state, "dead");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    mount_delete(&server, 3, 1).await;
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_start_times_out_and_closes() {
    let server = MockServer::start().await;
    mount_create(&server, 5).await;
    mount_state(&server, 5, "starting").await;
    mount_delete(&server, 5, 1).await;

    let err = LivySession::start(
        client_for(&server),
        &SessionRequest::new("slow"),
        fast_polling(50),
    )
    .await
    .unwrap_err();

    match err {
        Error::SessionTimeout { id, elapsed } => {
            assert_eq!(id, 5);
            assert!(elapsed <= Duration::from_millis(50));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    mount_delete(&server, 0, 1).await;

    session.close().await.unwrap();
    session.close().await.unwrap();
    assert!(session.is_closed());
    assert!(session.client().is_closed());
}

#[tokio::test]
async fn test_close_tolerates_missing_session() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/sessions/0"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    session.close().await.unwrap();
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_close_failure_keeps_session_open() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/sessions/0"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_delete(&server, 0, 1).await;

    let err = session.close().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!session.is_closed());

    session.close().await.unwrap();
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_state_after_close_makes_no_request() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    mount_delete(&server, 0, 1).await;
    session.close().await.unwrap();

    let requests_before = server.received_requests().await.unwrap().len();
    let err = session.state().await.unwrap_err();
    assert!(matches!(err, Error::SessionLookup { id: 0, .. }));
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_before
    );
}

#[tokio::test]
async fn test_state_of_deleted_session() {
    let server = MockServer::start().await;
    mount_create(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/sessions/2"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Session '2' not found."))
        .mount(&server)
        .await;
    mount_delete(&server, 2, 1).await;

    let mut session = LivySession::create(
        client_for(&server),
        &SessionRequest::new("gone"),
        fast_polling(100),
    )
    .await
    .unwrap();

    let err = session.state().await.unwrap_err();
    assert!(matches!(err, Error::SessionLookup { id: 2, .. }));
    session.close().await.unwrap();
}

// Execution

#[tokio::test]
async fn test_run_scalar_result() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    mount_statement(
        &server,
        json!({"status": "ok", "execution_count": 0, "data": {"text/plain": "res0: Int = 2"}}),
    )
    .await;
    mount_delete(&server, 0, 1).await;

    let batch = session.run("1 + 1").await.unwrap();
    assert_eq!(batch.num_rows(), 1);
    assert_eq!(batch.schema().field(0).name(), VALUE_COLUMN);
    let values = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(values.value(0), 2);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_run_sends_code_and_kind() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/sessions/0/statements"))
        .and(body_json(json!({"code": "SELECT 1", "kind": "sql"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 0,
            "state": "available",
            "output": {"status": "ok", "execution_count": 0, "data": {"text/plain": "1"}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 0, 1).await;

    let batch = session
        .run_with_kind("SELECT 1", Some(SessionKind::Sql))
        .await
        .unwrap();
    assert_eq!(batch.num_rows(), 1);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_run_tabular_result_keeps_column_order() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    mount_statement(
        &server,
        json!({
            "status": "ok",
            "execution_count": 1,
            "data": {"application/json": {
                "schema": {"type": "struct", "fields": [
                    {"name": "zeta", "type": "string"},
                    {"name": "alpha", "type": "long"}
                ]},
                "data": [["a", 1], ["b", 2], [null, 3]]
            }}
        }),
    )
    .await;
    mount_delete(&server, 0, 1).await;

    let batch = session.run("df.show()").await.unwrap();
    let names: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, vec!["zeta", "alpha"]);
    assert_eq!(batch.num_rows(), 3);

    let zeta = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(zeta.value(1), "b");
    assert!(zeta.is_null(2));

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_run_statement_error() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    mount_statement(
        &server,
        json!({
            "status": "error",
            "execution_count": 2,
            "ename": "NameError",
            "evalue": "name 'x' is not defined",
            "traceback": ["Traceback ...\n"]
        }),
    )
    .await;
    mount_delete(&server, 0, 1).await;

    let err = session.run("x").await.unwrap_err();
    match err {
        Error::StatementExecution {
            statement_id,
            message,
        } => {
            assert_eq!(statement_id, 0);
            assert!(message.starts_with("NameError: name 'x' is not defined"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_run_statement_timeout_cancels() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/sessions/0/statements"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 4, "state": "running"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/0/statements/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4, "state": "running"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions/0/statements/4/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "canceled"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 0, 1).await;

    let err = session.run("while True: pass").await.unwrap_err();
    assert!(matches!(err, Error::StatementTimeout { statement_id: 4, .. }));

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_run_on_dead_session() {
    let server = MockServer::start().await;
    mount_create(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/sessions/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(0, "idle")))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_state(&server, 0, "dead").await;
    mount_delete(&server, 0, 1).await;

    let mut session = LivySession::start(
        client_for(&server),
        &SessionRequest::new("test"),
        fast_polling(100),
    )
    .await
    .unwrap();

    let err = session.run("1").await.unwrap_err();
    match err {
        Error::SessionNotReady { id, state } => {
            assert_eq!(id, 0);
            assert_eq!(state, "dead");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    session.close().await.unwrap();
}

#[test_case("res3: Long = 42", json!(42) ; "scala long")]
#[test_case("res0: Double = 2.5", json!(2.5) ; "scala double")]
#[test_case("res1: Boolean = true", json!(true) ; "scala boolean")]
#[test_case("res2: String = hello world", json!("hello world") ; "scala string")]
#[test_case("7\n", json!(7) ; "python int")]
#[test_case("False", json!(false) ; "python bool")]
#[test_case("[1, 2]", json!("[1, 2]") ; "python list")]
fn test_parse_scalar(text: &str, expected: JsonValue) {
    assert_eq!(parse_scalar(text), expected);
}

#[test]
fn test_statement_output_as_record_array() {
    let statement = Statement::from_json(&json!({
        "id": 1,
        "state": "available",
        "output": {
            "status": "ok",
            "data": {"application/json": [
                {"name": "a", "score": 1.5, "ok": true},
                {"name": "b", "score": 2.0, "ok": false}
            ]}
        }
    }))
    .unwrap();

    let batch = statement.to_record_batch().unwrap();
    assert_eq!(batch.num_columns(), 3);
    assert_eq!(batch.num_rows(), 2);

    let schema = batch.schema();
    let score = batch
        .column(schema.index_of("score").unwrap())
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(score.value(1), 2.0);
    let ok = batch
        .column(schema.index_of("ok").unwrap())
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(ok.value(0));
}

#[test]
fn test_cancelled_statement_is_error() {
    let statement = Statement::from_json(&json!({"id": 9, "state": "cancelled"})).unwrap();
    let err = statement.to_record_batch().unwrap_err();
    assert!(matches!(err, Error::StatementExecution { statement_id: 9, .. }));
}

// Names and table writes

#[test_case(Some("t"), Some("s"), Some("d"), "d.s.t" ; "all parts")]
#[test_case(Some("t"), Some("s"), None, "s.t" ; "schema and table")]
#[test_case(Some("t"), None, None, "t" ; "table only")]
#[test_case(Some("t"), None, Some("d"), "t" ; "database without schema")]
#[test_case(Some("t"), Some(""), Some(""), "t" ; "empty parts")]
fn test_qualified_name(table: Option<&str>, schema: Option<&str>, database: Option<&str>, expected: &str) {
    assert_eq!(qualified_name(table, schema, database).unwrap(), expected);
}

#[test_case(None, Some("s") ; "missing table")]
#[test_case(Some(""), Some("s") ; "empty table")]
#[test_case(Some("t; DROP"), None ; "invalid characters")]
fn test_qualified_name_invalid(table: Option<&str>, schema: Option<&str>) {
    let err = qualified_name(table, schema, None).unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }));
}

#[tokio::test]
async fn test_write_statement_policies() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    mount_delete(&server, 0, 1).await;

    let writer = TableWriter::new(&session, "df");
    assert_eq!(
        writer.write_statement("s.t", IfExists::Fail).unwrap(),
        "df.writeTo(\"s.t\").create()"
    );
    assert_eq!(
        writer.write_statement("s.t", IfExists::Replace).unwrap(),
        "df.writeTo(\"s.t\").createOrReplace()"
    );
    assert_eq!(
        writer.write_statement("s.t", IfExists::Append).unwrap(),
        "df.writeTo(\"s.t\").append()"
    );
    assert_eq!(
        writer.write_statement("s.t", IfExists::Skip).unwrap(),
        "if not spark.catalog.tableExists(\"s.t\"):\n    df.writeTo(\"s.t\").create()"
    );
    assert_eq!(
        writer.write_statement("s.t", IfExists::Delete).unwrap(),
        "spark.sql(\"DROP TABLE IF EXISTS s.t\")\ndf.writeTo(\"s.t\").create()"
    );

    let bad = TableWriter::new(&session, "df.limit(1)");
    assert!(matches!(
        bad.write_statement("s.t", IfExists::Fail).unwrap_err(),
        Error::InvalidName { .. }
    ));

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_write_table_submits_pyspark() {
    let server = MockServer::start().await;
    let mut session = ready_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/sessions/0/statements"))
        .and(body_string_contains("createOrReplace"))
        .and(body_string_contains("\"kind\":\"pyspark\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 0,
            "state": "available",
            "output": {"status": "ok", "execution_count": 0, "data": {"text/plain": ""}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 0, 1).await;

    let name = TableWriter::new(&session, "df")
        .write_table("events", Some("raw"), Some("lake"), IfExists::Replace)
        .await
        .unwrap();
    assert_eq!(name, "lake.raw.events");

    session.close().await.unwrap();
}
