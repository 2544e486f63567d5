//! Export/import payloads exchanged with the UI (file download/upload).
//!
//! Imports are parsed into typed payloads before any store state is
//! touched. A payload either parses completely or is rejected with an
//! [`ImportError`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ImportError;
use crate::profiles::UserProfile;
use crate::values::CalculatorValues;

/// Version tag written into and required from every export.
pub const EXPORT_VERSION: &str = "1.0";

/// Backup of every calculator's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesExport {
    pub values: CalculatorValues,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

/// A single user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileExport {
    pub profile: UserProfile,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

/// Every user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesExport {
    pub profiles: Vec<UserProfile>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

/// How strictly the `version` tag is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPolicy {
    /// The tag must be present and equal to [`EXPORT_VERSION`].
    Required,
    /// A missing tag is accepted; a present one must still match.
    Optional,
}

/// Extract and decode the `section` field of an export payload.
///
/// The version tag is checked first, then the section's presence, then its
/// shape. `null` counts as absent.
pub fn parse_section<T: DeserializeOwned>(
    data: &Value,
    section: &'static str,
    policy: VersionPolicy,
) -> Result<T, ImportError> {
    let obj = data
        .as_object()
        .ok_or(ImportError::MissingSection(section))?;

    match obj.get("version") {
        Some(Value::String(v)) if v == EXPORT_VERSION => {}
        Some(Value::String(v)) => return Err(ImportError::UnsupportedVersion(v.clone())),
        Some(other) if !other.is_null() => {
            return Err(ImportError::UnsupportedVersion(other.to_string()))
        }
        _ if policy == VersionPolicy::Required => {
            return Err(ImportError::UnsupportedVersion("<missing>".to_string()))
        }
        _ => {}
    }

    let value = obj
        .get(section)
        .filter(|v| !v.is_null())
        .ok_or(ImportError::MissingSection(section))?;

    Ok(T::deserialize(value)?)
}
