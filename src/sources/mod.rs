//! Data sources
//!
//! REST connectors built on the shared [`HttpClient`](crate::http::HttpClient):
//!
//! - [`GitlabWiki`]: read and update GitLab project wiki pages
//! - [`BusinessCore`]: token login and view extraction from the Business Core ERP API

pub mod business_core;
pub mod gitlab;

pub use business_core::{BusinessCore, Filters};
pub use gitlab::{split_repository_url, GitlabWiki, WikiPage};
