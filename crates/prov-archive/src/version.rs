//! Archive format version gate
//!
//! The gate looks at the metadata document only. Importers call
//! [`check_version`] before the data document is parsed or the target store
//! is touched.

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::ArchiveMetadata;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Version written by this crate
pub const CURRENT_VERSION: &str = "0.3";

/// Versions this crate can read
pub const SUPPORTED_VERSIONS: &[&str] = &[CURRENT_VERSION];

/// Archive format version string
///
/// Older producers wrote the version as a JSON number; those are accepted
/// and stringified so the gate can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FormatVersion(String);

impl FormatVersion {
    /// Version written by this crate
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self(CURRENT_VERSION.to_string())
    }

    /// Wrap a version string without checking it
    #[inline]
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Version as written in `metadata.json`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this version is in [`SUPPORTED_VERSIONS`]
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_VERSIONS.contains(&self.0.as_str())
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            other => Ok(Self(other.to_string())),
        }
    }
}

/// Reject archives whose format version is not supported
///
/// # Errors
/// Returns [`ArchiveError::UnsupportedVersion`]
pub fn check_version(metadata: &ArchiveMetadata) -> ArchiveResult<()> {
    if metadata.export_version.is_supported() {
        return Ok(());
    }
    Err(ArchiveError::UnsupportedVersion {
        found: metadata.export_version.to_string(),
        supported: SUPPORTED_VERSIONS.iter().map(|v| (*v).to_string()).collect(),
    })
}
