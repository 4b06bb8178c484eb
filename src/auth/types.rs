//! Auth configuration types

use chrono::{DateTime, Utc};

/// Login endpoint settings for token-based auth
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Login endpoint URL
    pub url: String,
    /// HTTP method used for the login call
    pub method: reqwest::Method,
    /// Form fields sent as `application/x-www-form-urlencoded`
    pub form: Vec<(String, String)>,
    /// Dotted path of the token in the login response
    pub token_path: String,
    /// Dotted path of the token lifetime (seconds) in the login response
    pub expires_in_path: Option<String>,
}

impl LoginConfig {
    /// Create a login config posting a form to `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: reqwest::Method::POST,
            form: Vec::new(),
            token_path: "access_token".to_string(),
            expires_in_path: Some("expires_in".to_string()),
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: reqwest::Method) -> Self {
        self.method = method;
        self
    }

    /// Add a form field
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Set the token path
    #[must_use]
    pub fn token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// A single static header
    Header {
        /// Header name
        name: String,
        /// Header value
        value: String,
    },

    /// Token fetched from a login endpoint, sent as a bearer token
    Login(LoginConfig),
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_login_config_builder() {
        let login = LoginConfig::new("https://api.example.com/login")
            .method(reqwest::Method::GET)
            .field("grant_type", "password")
            .token_path("data.token");

        assert_eq!(login.method, reqwest::Method::GET);
        assert_eq!(login.form.len(), 1);
        assert_eq!(login.token_path, "data.token");
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
    }
}
