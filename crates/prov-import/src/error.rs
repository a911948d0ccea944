//! Import error types

use prov_archive::ArchiveError;
use prov_model::NodeUuid;
use prov_store::StoreError;

/// Errors that abort an import
///
/// The target store is left exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Unreadable, unsupported or corrupt archive
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Store failure, surfaced verbatim
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A link or group membership points at a node that is in neither the
    /// archive nor the target store
    #[error("{referenced_by} references node {uuid}, which is neither in the archive nor in the store")]
    UnknownNode { uuid: NodeUuid, referenced_by: String },

    /// Invalid import options document
    #[error("invalid import options: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
