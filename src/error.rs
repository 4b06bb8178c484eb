//! Error types for conduit-cdk
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::time::Duration;
use thiserror::Error;

/// The main error type for conduit-cdk
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Credential / Authentication Errors
    // ============================================================================
    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Client is closed")]
    ClientClosed,

    // ============================================================================
    // Livy Session Errors
    // ============================================================================
    #[error("Session creation rejected (HTTP {status}): {body}")]
    SessionCreation { status: u16, body: String },

    #[error("Session {id} not found: {message}")]
    SessionLookup { id: i64, message: String },

    #[error("Session {id} not ready after {elapsed:?}")]
    SessionTimeout { id: i64, elapsed: Duration },

    #[error("Session {id} failed to start, reached state '{state}'")]
    SessionFailedToStart { id: i64, state: String },

    #[error("Session {id} is not ready, current state '{state}'")]
    SessionNotReady { id: i64, state: String },

    // ============================================================================
    // Statement Errors
    // ============================================================================
    #[error("Statement {statement_id} failed: {message}")]
    StatementExecution { statement_id: i64, message: String },

    #[error("Statement {statement_id} did not complete after {elapsed:?}")]
    StatementTimeout { statement_id: i64, elapsed: Duration },

    #[error("Invalid table name: {message}")]
    InvalidName { message: String },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a credential error
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a session lookup error
    pub fn session_lookup(id: i64, message: impl Into<String>) -> Self {
        Self::SessionLookup {
            id,
            message: message.into(),
        }
    }

    /// Create a statement execution error
    pub fn statement(statement_id: i64, message: impl Into<String>) -> Self {
        Self::StatementExecution {
            statement_id,
            message: message.into(),
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::InvalidName {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } | Error::SessionCreation { status, .. } => {
                Some(*status)
            }
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a transport-level failure (network or non-2xx status)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::HttpStatus { .. } | Error::Timeout { .. }
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for conduit-cdk
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
