//! Export options

use crate::closure::ReturnLinkPolicy;
use crate::error::ExportResult;
use crate::license::LicensePolicy;
use prov_archive::ArchiveFormat;
use serde::{Deserialize, Serialize};

/// Tunables of one export call
///
/// Loadable from TOML; license predicates can only be attached in code.
///
/// ```toml
/// overwrite = true
/// format = "zip"
/// return_links = "omit"
///
/// [license]
/// allowed = ["GPL", "CC0"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Replace an existing destination file
    pub overwrite: bool,
    /// Container format; inferred from the destination extension when unset
    pub format: Option<ArchiveFormat>,
    /// RETURN link handling
    pub return_links: ReturnLinkPolicy,
    /// License filter
    pub license: LicensePolicy,
}

impl ExportOptions {
    /// Parse options from TOML
    ///
    /// # Errors
    /// Returns [`ExportError::Config`](crate::ExportError::Config) on invalid input
    pub fn from_toml_str(s: &str) -> ExportResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Builder: replace an existing destination
    #[inline]
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Builder: force the container format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Builder: set how RETURN links are carried
    #[inline]
    #[must_use]
    pub fn with_return_links(mut self, policy: ReturnLinkPolicy) -> Self {
        self.return_links = policy;
        self
    }

    /// Builder: set the license policy
    #[inline]
    #[must_use]
    pub fn with_license(mut self, license: LicensePolicy) -> Self {
        self.license = license;
        self
    }
}
