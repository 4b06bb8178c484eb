//! HTTP client module
//!
//! Shared transport for the connectors in [`crate::sources`].
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **TLS Policy**: Disable verification or trust an extra CA bundle
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{build_client, HttpClient, HttpClientConfig, MultipartFile, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

pub(crate) use client::join_url;
