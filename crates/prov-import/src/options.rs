//! Import options and caller context

use crate::error::ImportResult;
use serde::{Deserialize, Serialize};

/// Tunables of one import call
///
/// ```toml
/// ignore_unknown_nodes = true
/// verify_checksums = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Drop links and memberships that reference unknown nodes instead of
    /// failing
    pub ignore_unknown_nodes: bool,
    /// Check payload hashes against the data document
    pub verify_checksums: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            ignore_unknown_nodes: false,
            verify_checksums: true,
        }
    }
}

impl ImportOptions {
    /// Parse options from TOML
    ///
    /// # Errors
    /// Returns [`ImportError::Config`](crate::ImportError::Config) on invalid input
    pub fn from_toml_str(s: &str) -> ImportResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Builder: drop references to unknown nodes instead of failing
    #[inline]
    #[must_use]
    pub fn with_ignore_unknown_nodes(mut self, ignore: bool) -> Self {
        self.ignore_unknown_nodes = ignore;
        self
    }

    /// Builder: check payload hashes while loading
    #[inline]
    #[must_use]
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

/// Who is importing
///
/// Records without an owner are attributed to `default_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    /// Email of the fallback owner
    pub default_user: String,
}

impl ImportContext {
    /// Context attributing unowned records to `default_user`
    #[inline]
    #[must_use]
    pub fn new(default_user: impl Into<String>) -> Self {
        Self {
            default_user: default_user.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let options = ImportOptions::default();
        assert!(!options.ignore_unknown_nodes);
        assert!(options.verify_checksums);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = ImportOptions::from_toml_str("ignore_unknown_nodes = true").unwrap();
        assert!(options.ignore_unknown_nodes);
        assert!(options.verify_checksums);
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let err = ImportOptions::from_toml_str("verify_checksums = \"yes\"").unwrap_err();
        assert!(matches!(err, crate::ImportError::Config(_)));
    }
}
