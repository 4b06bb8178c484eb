//! Common types used throughout conduit-cdk
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Existence Policy
// ============================================================================

/// What to do when the destination (file or table) already exists
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Raise an error
    #[default]
    Fail,
    /// Overwrite the existing data
    Replace,
    /// Insert into the existing data
    Append,
    /// Leave the existing data untouched
    Skip,
    /// Drop the destination, then create it
    Delete,
}

impl IfExists {
    /// Policy name as used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            IfExists::Fail => "fail",
            IfExists::Replace => "replace",
            IfExists::Append => "append",
            IfExists::Skip => "skip",
            IfExists::Delete => "delete",
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TLS Verification
// ============================================================================

/// TLS certificate verification policy
///
/// Deserializes from `true`/`false` or from a path to a PEM trust bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsVerify {
    /// Verify against the system roots
    #[default]
    Enabled,
    /// Accept any certificate
    Disabled,
    /// Verify against an additional CA bundle
    CaBundle(PathBuf),
}

impl From<bool> for TlsVerify {
    fn from(verify: bool) -> Self {
        if verify {
            TlsVerify::Enabled
        } else {
            TlsVerify::Disabled
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TlsVerifyRepr {
    Flag(bool),
    Path(PathBuf),
}

impl<'de> Deserialize<'de> for TlsVerify {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match TlsVerifyRepr::deserialize(deserializer)? {
            TlsVerifyRepr::Flag(flag) => flag.into(),
            TlsVerifyRepr::Path(path) => TlsVerify::CaBundle(path),
        })
    }
}

impl Serialize for TlsVerify {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            TlsVerify::Enabled => TlsVerifyRepr::Flag(true),
            TlsVerify::Disabled => TlsVerifyRepr::Flag(false),
            TlsVerify::CaBundle(path) => TlsVerifyRepr::Path(path.clone()),
        };
        repr.serialize(serializer)
    }
}
