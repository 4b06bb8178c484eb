//! Business Core ERP API

use crate::auth::{AuthConfig, LoginConfig};
use crate::config::{require_field, resolve_credentials, CredentialSource};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::output::json_to_arrow;
use crate::types::{JsonObject, JsonValue, TlsVerify};
use arrow::record_batch::RecordBatch;
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info};

/// Token endpoint of the public API
pub const DEFAULT_LOGIN_URL: &str = "https://api.businesscore.ae/api/user/Login";

/// Default credentials key
pub const DEFAULT_CREDENTIALS_KEY: &str = "BusinessCore";

/// Response fields that hold the rows, in lookup order
const DATA_FIELDS: &[&str] = &["MasterDataList", "ViewDataList"];

/// Paging and date filters sent with every data request
///
/// Unset filters are sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filters {
    pub bucket_count: Option<u32>,
    pub bucket_no: Option<u32>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

/// Client for one Business Core view
#[derive(Debug)]
pub struct BusinessCore {
    http: HttpClient,
    url: String,
    filters: Filters,
}

impl BusinessCore {
    /// Create a client for the view at `url`
    ///
    /// Credentials must contain `username` and `password`.
    pub fn new(
        url: impl Into<String>,
        filters: Filters,
        credentials: Option<&JsonObject>,
        source: &dyn CredentialSource,
        verify: TlsVerify,
    ) -> Result<Self> {
        Self::with_login_url(url, filters, credentials, source, verify, DEFAULT_LOGIN_URL)
    }

    /// Like [`BusinessCore::new`] with a different token endpoint
    pub fn with_login_url(
        url: impl Into<String>,
        filters: Filters,
        credentials: Option<&JsonObject>,
        source: &dyn CredentialSource,
        verify: TlsVerify,
        login_url: &str,
    ) -> Result<Self> {
        let mapping = resolve_credentials(credentials, source, DEFAULT_CREDENTIALS_KEY)?;
        let login = LoginConfig::new(login_url)
            .method(Method::GET)
            .field("grant_type", "password")
            .field("username", require_field(&mapping, "username")?)
            .field("password", require_field(&mapping, "password")?)
            .field("scope", "");

        let config = HttpClientConfig::builder().tls(verify).build();
        let http = HttpClient::with_auth(config, AuthConfig::Login(login))?;

        Ok(Self {
            http,
            url: url.into(),
            filters,
        })
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Log in and return the API token
    ///
    /// The token is cached and reused by later data requests.
    pub async fn generate_token(&self) -> Result<String> {
        let auth = self
            .http
            .authenticator()
            .ok_or_else(|| Error::auth("No authenticator configured"))?;
        auth.token().await
    }

    /// Fetch the raw view response
    pub async fn get_data(&self) -> Result<JsonValue> {
        debug!("Fetching Business Core view {}", self.url);
        let body = serde_json::to_value(&self.filters)?;
        self.http
            .request_json(Method::GET, &self.url, RequestConfig::new().json(body))
            .await
    }

    /// Fetch the view as JSON records
    pub async fn fetch_records(&self) -> Result<Vec<JsonValue>> {
        let response = self.get_data().await?;
        let records = to_records(&response)?;
        info!("Fetched {} records from {}", records.len(), self.url);
        Ok(records)
    }

    /// Fetch the view as a record batch
    pub async fn to_record_batch(&self) -> Result<RecordBatch> {
        let records = self.fetch_records().await?;
        json_to_arrow(&records, None)
    }
}

/// Extract the row list from a view response
///
/// Looks for `MasterDataList`, then `ViewDataList`, then the first array
/// field of the response. A bare array is returned as is.
pub fn to_records(response: &JsonValue) -> Result<Vec<JsonValue>> {
    if let JsonValue::Array(rows) = response {
        return Ok(rows.clone());
    }

    let obj = response
        .as_object()
        .ok_or_else(|| Error::decode("Business Core response is not a JSON object"))?;

    DATA_FIELDS
        .iter()
        .find_map(|field| obj.get(*field).and_then(JsonValue::as_array))
        .or_else(|| obj.values().find_map(JsonValue::as_array))
        .cloned()
        .ok_or_else(|| Error::decode("Business Core response contains no data list"))
}
