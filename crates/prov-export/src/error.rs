//! Export error types

use crate::license::LicensingError;
use prov_archive::ArchiveError;
use prov_store::{EntityKind, StoreError};

/// Errors that abort an export
///
/// No archive is left at the destination when any of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A node in the closure failed the license policy
    #[error("licensing violation: {0}")]
    Licensing(#[from] LicensingError),

    /// Seed node or group does not exist in the store
    #[error("cannot export unknown {kind} {id}")]
    UnknownSeed { kind: EntityKind, id: String },

    /// Store failure, surfaced verbatim
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Archive writing failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Invalid export options document
    #[error("invalid export options: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
