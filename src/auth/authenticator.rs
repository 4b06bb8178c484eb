//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{AuthConfig, CachedToken, LoginConfig};
use crate::error::{Error, Result};
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached token for login auth
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),

            AuthConfig::Basic { username, password } => {
                Ok(req.basic_auth(username, Some(password)))
            }

            AuthConfig::Header { name, value } => Ok(req.header(name.as_str(), value.as_str())),

            AuthConfig::Login(login) => {
                let token = self.get_or_refresh_token(login).await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Get a valid token, logging in again if necessary
    pub async fn token(&self) -> Result<String> {
        match &self.config {
            AuthConfig::Login(login) => self.get_or_refresh_token(login).await,
            _ => Err(Error::auth("Auth type does not produce a token")),
        }
    }

    async fn get_or_refresh_token(&self, login: &LoginConfig) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have logged in while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.login(login).await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Call the login endpoint and extract the token
    async fn login(&self, login: &LoginConfig) -> Result<CachedToken> {
        debug!("Fetching token from {}", login.url);

        let response = self
            .http_client
            .request(login.method.clone(), &login.url)
            .form(&login.form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth {
                message: format!("Login request failed with status {status}: {body}"),
            });
        }

        let body: Value = response.json().await.map_err(Error::Http)?;

        let token = extract_token(&body, &login.token_path).ok_or_else(|| Error::Auth {
            message: format!("Could not extract token from path: {}", login.token_path),
        })?;

        let expires_at = login
            .expires_in_path
            .as_deref()
            .and_then(|path| extract_token(&body, path))
            .and_then(|v| v.parse::<i64>().ok())
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Ok(CachedToken::new(token, expires_at))
    }

    /// Clear the cached token
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.config {
            AuthConfig::None => "none",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Header { .. } => "header",
            AuthConfig::Login(_) => "login",
        };
        f.debug_struct("Authenticator")
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}

/// Extract a scalar from JSON using a dotted path ("$.data.token" or "data.token")
pub fn extract_token(value: &Value, path: &str) -> Option<String> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
