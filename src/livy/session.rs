//! Livy session resource model

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a Livy session
///
/// Mirrors `org.apache.livy.sessions.SessionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Starting,
    Recovering,
    Idle,
    Running,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
}

/// States in which the caller must keep waiting
pub const NOT_READY: &[SessionState] = &[SessionState::NotStarted, SessionState::Starting];

/// Terminal states; no further transitions happen
pub const FINISHED: &[SessionState] = &[
    SessionState::Error,
    SessionState::Dead,
    SessionState::Killed,
    SessionState::Success,
];

impl SessionState {
    /// Session is still being brought up
    pub fn is_not_ready(self) -> bool {
        NOT_READY.contains(&self)
    }

    /// Session has terminated
    pub fn is_finished(self) -> bool {
        FINISHED.contains(&self)
    }

    /// Session can accept statements
    pub fn is_active(self) -> bool {
        !self.is_not_ready() && !self.is_finished()
    }

    /// Wire name of the state
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::Starting => "starting",
            SessionState::Recovering => "recovering",
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Busy => "busy",
            SessionState::ShuttingDown => "shutting_down",
            SessionState::Error => "error",
            SessionState::Dead => "dead",
            SessionState::Killed => "killed",
            SessionState::Success => "success",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpreter kind of a session or statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Spark,
    Pyspark,
    Sparkr,
    Sql,
}

/// Point-in-time snapshot of a remote session
///
/// A new value is parsed on every status fetch; snapshots are never updated
/// in place.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    /// Server-assigned identifier
    pub id: i64,
    /// State at the time of the fetch
    pub state: SessionState,
    /// Session name, if one was given at creation
    #[serde(default)]
    pub name: Option<String>,
    /// Interpreter kind
    #[serde(default)]
    pub kind: Option<SessionKind>,
    /// YARN/Spark application id
    #[serde(default, rename = "appId")]
    pub app_id: Option<String>,
}

impl Session {
    /// Parse a session from its JSON representation
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        Session::deserialize(value).map_err(|e| Error::decode(format!("Invalid session: {e}")))
    }
}

/// Body of a session creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jars: Vec<String>,
    #[serde(skip_serializing_if = "JsonObject::is_empty")]
    pub conf: JsonObject,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub py_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_executors: Option<u32>,
}

impl SessionRequest {
    /// Create a request for a session with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: SessionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn num_executors(mut self, count: u32) -> Self {
        self.num_executors = Some(count);
        self
    }

    #[must_use]
    pub fn jar(mut self, path: impl Into<String>) -> Self {
        self.jars.push(path.into());
        self
    }

    #[must_use]
    pub fn py_file(mut self, path: impl Into<String>) -> Self {
        self.py_files.push(path.into());
        self
    }

    #[must_use]
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Set a Spark configuration property
    #[must_use]
    pub fn conf(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.conf.insert(key.into(), value.into());
        self
    }
}
