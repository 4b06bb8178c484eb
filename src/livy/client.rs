//! Livy REST transport
//!
//! A thin JSON-over-HTTP client bound to a single Livy server. Unlike
//! [`crate::http::HttpClient`] it never retries: callers decide whether a
//! failed call is worth repeating.

use super::session::{Session, SessionRequest};
use super::statement::{Statement, StatementRequest};
use crate::auth::{AuthConfig, Authenticator};
use crate::config::BasicCredentials;
use crate::error::{Error, Result};
use crate::http::build_client;
use crate::types::{JsonObject, JsonValue, StringMap, TlsVerify};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// Longest response body kept in error messages
const MAX_BODY_SNIPPET: usize = 512;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection establishment timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a Livy server
///
/// When built with [`LivyClient::new`] the client owns its connection pool and
/// releases it on [`close`](LivyClient::close). A pool supplied through
/// [`LivyClient::with_http_client`] stays the caller's responsibility and
/// `close` leaves it untouched.
pub struct LivyClient {
    url: String,
    username: String,
    auth: Authenticator,
    http: Option<Client>,
    managed: bool,
}

impl LivyClient {
    /// Create a client that owns its connection
    pub fn new(
        url: impl Into<String>,
        credentials: BasicCredentials,
        verify: TlsVerify,
    ) -> Result<Self> {
        Self::with_timeouts(
            url,
            credentials,
            verify,
            DEFAULT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT,
        )
    }

    /// Create a client that owns its connection, with explicit timeouts
    pub fn with_timeouts(
        url: impl Into<String>,
        credentials: BasicCredentials,
        verify: TlsVerify,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let user_agent = format!("conduit-cdk/{}", env!("CARGO_PKG_VERSION"));
        let http = build_client(timeout, connect_timeout, &user_agent, &verify)?;
        let (username, auth) = basic_auth(credentials);
        Ok(Self {
            url: url.into(),
            username,
            auth,
            http: Some(http),
            managed: true,
        })
    }

    /// Create a client from a credentials mapping with `username` and `password`
    pub fn from_credentials(
        url: impl Into<String>,
        credentials: &JsonObject,
        verify: TlsVerify,
    ) -> Result<Self> {
        let credentials = BasicCredentials::from_mapping(credentials)?;
        Self::new(url, credentials, verify)
    }

    /// Create a client on top of a caller-owned reqwest client
    pub fn with_http_client(
        url: impl Into<String>,
        credentials: BasicCredentials,
        http: Client,
    ) -> Self {
        let (username, auth) = basic_auth(credentials);
        Self {
            url: url.into(),
            username,
            auth,
            http: Some(http),
            managed: false,
        }
    }

    /// Base URL of the Livy server
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether this client owns (and closes) its connection
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    /// Whether the owned connection has been released
    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    /// Release the connection if this client owns it
    pub fn close(&mut self) {
        if self.managed && self.http.take().is_some() {
            debug!("Closed Livy connection to {}", self.url);
        }
    }

    /// GET `endpoint` with optional query parameters
    pub async fn get(&self, endpoint: &str, params: Option<&StringMap>) -> Result<JsonValue> {
        self.request(Method::GET, endpoint, None, params).await
    }

    /// POST `endpoint` with an optional JSON body
    pub async fn post(&self, endpoint: &str, data: Option<&JsonValue>) -> Result<JsonValue> {
        self.request(Method::POST, endpoint, data, None).await
    }

    /// DELETE `endpoint`
    pub async fn delete(&self, endpoint: &str) -> Result<JsonValue> {
        self.request(Method::DELETE, endpoint, None, None).await
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        data: Option<&JsonValue>,
        params: Option<&StringMap>,
    ) -> Result<JsonValue> {
        let http = self.http.as_ref().ok_or(Error::ClientClosed)?;
        let url = crate::http::join_url(&self.url, endpoint);
        debug!("Livy request: {} {}", method, url);

        let mut req = self.auth.apply(http.request(method, &url)).await?;
        if let Some(params) = params {
            req = req.query(params);
        }
        if let Some(data) = data {
            req = req.json(data);
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), snippet(&body)));
        }

        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            Error::decode(format!("Invalid JSON from {url}: {e}: {}", snippet(&body)))
        })
    }

    /// Version string reported by the server
    pub async fn server_version(&self) -> Result<String> {
        let response = self.get("/version", None).await?;
        response
            .get("version")
            .and_then(JsonValue::as_str)
            .map(String::from)
            .ok_or_else(|| Error::decode("Response has no 'version' field"))
    }

    /// Create a session; a rejected request becomes [`Error::SessionCreation`]
    pub async fn create_session(&self, request: &SessionRequest) -> Result<Session> {
        let body = serde_json::to_value(request)?;
        let response = self
            .post("/sessions", Some(&body))
            .await
            .map_err(|e| match e {
                Error::HttpStatus { status, body } => Error::SessionCreation { status, body },
                other => other,
            })?;
        Session::from_json(&response)
    }

    /// Fetch the current snapshot of a session
    pub async fn get_session(&self, id: i64) -> Result<Session> {
        let response = self
            .get(&session_url(id), None)
            .await
            .map_err(|e| not_found_as_lookup(e, id))?;
        Session::from_json(&response)
    }

    /// List the sessions known to the server
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let response = self.get("/sessions", None).await?;
        response
            .get("sessions")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| Error::decode("Response has no 'sessions' array"))?
            .iter()
            .map(Session::from_json)
            .collect()
    }

    /// Terminate a session
    pub async fn delete_session(&self, id: i64) -> Result<()> {
        self.delete(&session_url(id))
            .await
            .map_err(|e| not_found_as_lookup(e, id))?;
        Ok(())
    }

    /// Submit code to a session
    pub async fn submit_statement(
        &self,
        session_id: i64,
        request: &StatementRequest,
    ) -> Result<Statement> {
        let body = serde_json::to_value(request)?;
        let response = self
            .post(&statements_url(session_id), Some(&body))
            .await
            .map_err(|e| not_found_as_lookup(e, session_id))?;
        Statement::from_json(&response)
    }

    /// Fetch the status and output of a statement
    pub async fn get_statement(&self, session_id: i64, statement_id: i64) -> Result<Statement> {
        let response = self
            .get(&statement_url(session_id, statement_id), None)
            .await
            .map_err(|e| not_found_as_lookup(e, session_id))?;
        Statement::from_json(&response)
    }

    /// Ask the server to cancel a running statement
    pub async fn cancel_statement(&self, session_id: i64, statement_id: i64) -> Result<()> {
        let url = format!("{}/cancel", statement_url(session_id, statement_id));
        self.post(&url, None).await?;
        Ok(())
    }
}

impl std::fmt::Debug for LivyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivyClient")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("managed", &self.managed)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn basic_auth(credentials: BasicCredentials) -> (String, Authenticator) {
    let username = credentials.username.clone();
    let auth = Authenticator::new(AuthConfig::Basic {
        username: credentials.username,
        password: credentials.password,
    });
    (username, auth)
}

fn session_url(id: i64) -> String {
    format!("/sessions/{id}")
}

fn statements_url(session_id: i64) -> String {
    format!("/sessions/{session_id}/statements")
}

fn statement_url(session_id: i64, statement_id: i64) -> String {
    format!("/sessions/{session_id}/statements/{statement_id}")
}

fn not_found_as_lookup(error: Error, id: i64) -> Error {
    match error {
        Error::HttpStatus { status: 404, body } => Error::session_lookup(id, body),
        other => other,
    }
}

fn snippet(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_SNIPPET) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
