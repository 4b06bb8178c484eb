//! Authentication module
//!
//! Supports: Basic (Livy), a static header (e.g. GitLab's `PRIVATE-TOKEN`)
//! and login-endpoint tokens.
//!
//! The `Authenticator` applies the configured scheme to each request and
//! caches tokens obtained from a login endpoint.

mod authenticator;
mod types;

pub use authenticator::{extract_token, Authenticator};
pub use types::{AuthConfig, CachedToken, LoginConfig};
