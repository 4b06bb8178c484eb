//! Settings file and credential lookup
//!
//! Settings are read from a YAML file holding named credential mappings and
//! Livy connection defaults:
//!
//! ```yaml
//! credentials:
//!   livy: { username: u, password: p }
//!   Gitlab: { token: t }
//! livy:
//!   url: https://livy.example.com
//!   verify: /etc/ssl/company-ca.pem
//!   polling: { rest_secs: 2.0, max_duration_secs: 600 }
//!   session: { name: etl, kind: pyspark, num_executors: 2 }
//! ```

use crate::error::{Error, Result};
use crate::livy::{LivyClient, PollingConfig, SessionKind, SessionRequest};
use crate::types::{JsonObject, JsonValue, TlsVerify};
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "CONDUIT_CONFIG";

/// Settings file location relative to the home directory
const DEFAULT_CONFIG_PATH: &str = ".config/conduit/config.yaml";

/// Username and password pair
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `username` and `password` from a credentials mapping
    pub fn from_mapping(mapping: &JsonObject) -> Result<Self> {
        Ok(Self::new(
            require_field(mapping, "username")?,
            require_field(mapping, "password")?,
        ))
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Anything that can look up a credentials mapping by key
pub trait CredentialSource {
    fn credentials(&self, key: &str) -> Option<JsonObject>;
}

impl CredentialSource for HashMap<String, JsonObject> {
    fn credentials(&self, key: &str) -> Option<JsonObject> {
        self.get(key).cloned()
    }
}

impl CredentialSource for Settings {
    fn credentials(&self, key: &str) -> Option<JsonObject> {
        self.credentials.credentials(key)
    }
}

/// Source with no credentials at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn credentials(&self, _key: &str) -> Option<JsonObject> {
        None
    }
}

/// Pick the credentials to use
///
/// A non-empty explicit mapping always wins; otherwise `key` is looked up in
/// `source`.
pub fn resolve_credentials(
    explicit: Option<&JsonObject>,
    source: &dyn CredentialSource,
    key: &str,
) -> Result<JsonObject> {
    if let Some(mapping) = explicit.filter(|m| !m.is_empty()) {
        return Ok(mapping.clone());
    }
    source
        .credentials(key)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::credential(format!("No credentials found for '{key}'")))
}

/// Get a required string field from a credentials mapping
pub fn require_field<'a>(mapping: &'a JsonObject, field: &str) -> Result<&'a str> {
    match mapping.get(field) {
        Some(JsonValue::String(s)) if !s.is_empty() => Ok(s),
        Some(JsonValue::String(_)) | None | Some(JsonValue::Null) => Err(Error::credential(
            format!("Missing required credential field '{field}'"),
        )),
        Some(_) => Err(Error::credential(format!(
            "Credential field '{field}' must be a string"
        ))),
    }
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Credential mappings by key
    pub credentials: HashMap<String, JsonObject>,
    pub livy: LivySettings,
}

/// Livy connection defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LivySettings {
    pub url: Option<String>,
    pub verify: TlsVerify,
    /// Key of the credentials mapping to use
    pub credentials_key: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub polling: PollingConfig,
    pub session: SessionSettings,
}

impl Default for LivySettings {
    fn default() -> Self {
        Self {
            url: None,
            verify: TlsVerify::Enabled,
            credentials_key: "livy".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            polling: PollingConfig::default(),
            session: SessionSettings::default(),
        }
    }
}

/// Defaults for new sessions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub name: Option<String>,
    pub kind: Option<SessionKind>,
    pub num_executors: Option<u32>,
    pub jars: Vec<String>,
    pub py_files: Vec<String>,
    pub files: Vec<String>,
    pub conf: JsonObject,
}

impl SessionSettings {
    /// Build a creation request; unnamed sessions get a timestamped name
    pub fn to_request(&self) -> SessionRequest {
        let name = self.name.clone().unwrap_or_else(|| {
            format!("conduit-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"))
        });
        SessionRequest {
            name,
            kind: self.kind,
            jars: self.jars.clone(),
            conf: self.conf.clone(),
            py_files: self.py_files.clone(),
            files: self.files.clone(),
            num_executors: self.num_executors,
        }
    }
}

impl Settings {
    /// Load settings from the resolved location
    ///
    /// An explicit path must exist. When the location comes from the
    /// environment or the home directory, a missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            return Self::from_file(path);
        }

        match resolve_config_path(
            None,
            std::env::var_os(CONFIG_ENV),
            std::env::var_os("HOME").map(PathBuf::from),
        ) {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Read and parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read settings file '{}': {e}",
                path.display()
            ))
        })?;
        debug!("Loaded settings from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse settings YAML: {e}")))
    }

    /// Build a Livy client from these settings
    ///
    /// `url` and `credentials` override the file's values.
    pub fn livy_client(
        &self,
        url: Option<&str>,
        credentials: Option<&JsonObject>,
        verify: Option<TlsVerify>,
    ) -> Result<LivyClient> {
        let url = url
            .map(String::from)
            .or_else(|| self.livy.url.clone())
            .ok_or_else(|| Error::invalid_value("livy.url", "no Livy URL configured"))?;
        let mapping = resolve_credentials(credentials, self, &self.livy.credentials_key)?;

        LivyClient::with_timeouts(
            url,
            BasicCredentials::from_mapping(&mapping)?,
            verify.unwrap_or_else(|| self.livy.verify.clone()),
            Duration::from_secs(self.livy.timeout_secs),
            Duration::from_secs(self.livy.connect_timeout_secs),
        )
    }
}

/// Settings file location: explicit path, then `CONDUIT_CONFIG`, then home
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env: Option<OsString>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    home.map(|home| home.join(DEFAULT_CONFIG_PATH))
}
