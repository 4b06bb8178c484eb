//! HTTP client with retry and rate limiting
//!
//! Provides the HTTP client shared by the connectors:
//! - Automatic retries with configurable backoff
//! - Rate limiting to prevent API throttling
//! - TLS verification policy
//! - JSON and multipart request bodies

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::types::TlsVerify;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Build a reqwest client honoring the TLS verification policy
pub fn build_client(
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: &str,
    tls: &TlsVerify,
) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(user_agent);

    match tls {
        TlsVerify::Enabled => {}
        TlsVerify::Disabled => {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        TlsVerify::CaBundle(path) => {
            let pem = std::fs::read(path).map_err(|e| {
                Error::invalid_value(
                    "verify",
                    format!("Cannot read CA bundle '{}': {e}", path.display()),
                )
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)?;
            builder = builder.add_root_certificate(cert);
        }
    }

    builder.build().map_err(Error::Http)
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
    /// TLS verification policy
    pub tls: TlsVerify,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("conduit-cdk/{}", env!("CARGO_PKG_VERSION")),
            tls: TlsVerify::Enabled,
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the exponential backoff bounds
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the TLS verification policy
    pub fn tls(mut self, tls: TlsVerify) -> Self {
        self.config.tls = tls;
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// A file sent as one part of a multipart form
#[derive(Debug, Clone)]
pub struct MultipartFile {
    /// Form field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Multipart file body
    pub file: Option<MultipartFile>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
    /// Override max retries for this request
    pub max_retries: Option<u32>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a file as a multipart form body
    #[must_use]
    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.file = Some(MultipartFile {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set max retries
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = build_client(
            config.timeout,
            config.connect_timeout,
            &config.user_agent,
            &config.tls,
        )?;
        Ok(Self::with_client(config, client))
    }

    /// Create a client around an existing reqwest client
    ///
    /// The TLS and timeout settings of `config` are ignored; the supplied
    /// client already carries its own.
    pub fn with_client(config: HttpClientConfig, client: Client) -> Self {
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        }
    }

    /// Create a client with authentication
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.set_authenticator(auth_config);
        Ok(client)
    }

    /// Set the authenticator
    pub fn set_authenticator(&mut self, auth_config: AuthConfig) {
        self.authenticator = Some(Authenticator::with_client(auth_config, self.client.clone()));
    }

    /// Get the authenticator, if any
    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(Method::GET, url, RequestConfig::default())
            .await
    }

    /// Make a GET request with config
    pub async fn get_with_config(&self, url: &str, config: RequestConfig) -> Result<Response> {
        self.request(Method::GET, url, config).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a generic request, retrying transient failures
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<Response> {
        let full_url = self.build_url(url);
        let max_retries = config.max_retries.unwrap_or(self.config.max_retries);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let mut attempt = 0;

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let req = self
                .build_request(method.clone(), &full_url, &config, timeout)
                .await?;

            let error = match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!("Request succeeded: {} {}", method, full_url);
                        return Ok(response);
                    }

                    if attempt < max_retries && is_retryable_status(status) {
                        let delay = if status == StatusCode::TOO_MANY_REQUESTS {
                            Duration::from_secs(extract_retry_after(&response))
                        } else {
                            self.calculate_backoff(attempt)
                        };
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(Error::RateLimited {
                            retry_after_seconds: extract_retry_after(&response),
                        });
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::http_status(status.as_u16(), body));
                }
                Err(e) if e.is_timeout() => Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                },
                Err(e) if e.is_connect() => Error::Http(e),
                Err(e) => return Err(Error::Http(e)),
            };

            if attempt >= max_retries {
                return Err(error);
            }

            let delay = self.calculate_backoff(attempt);
            warn!(
                "{}, attempt {}/{}, retrying in {:?}",
                error,
                attempt + 1,
                max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn build_request(
        &self,
        method: Method,
        url: &str,
        config: &RequestConfig,
        timeout: Duration,
    ) -> Result<RequestBuilder> {
        let mut req = self.client.request(method, url).timeout(timeout);

        for (key, value) in self.config.default_headers.iter().chain(&config.headers) {
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        if let Some(ref file) = config.file {
            let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            req = req.multipart(Form::new().part(file.field.clone(), part));
        } else if let Some(ref body) = config.body {
            req = req.json(body);
        }

        if let Some(ref auth) = self.authenticator {
            req = auth.apply(req).await?;
        }

        Ok(req)
    }

    /// Make a request and parse JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let response = self.request(method, url, config).await?;
        let json: T = response.json().await.map_err(Error::Http)?;
        Ok(json)
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.request_json(Method::GET, url, RequestConfig::default())
            .await
    }

    /// Make a PUT request with a JSON body and parse JSON response
    pub async fn put_json<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        self.request_json(Method::PUT, url, RequestConfig::default().json(body))
            .await
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => join_url(base, path),
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt, doubling from `initial_backoff`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.config.initial_backoff.saturating_mul(factor);
        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Join a base URL and an endpoint with exactly one `/` between them
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Check if an HTTP status is retryable
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Extract retry-after header value
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
