//! Archive error types

use prov_model::{ContentHash, ModelError, NodeUuid};
use std::path::{Path, PathBuf};

/// Errors raised while reading or writing archives
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Filesystem failure, with the path involved
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed JSON document inside the archive
    #[error("invalid JSON in {entry}: {source}")]
    Json {
        entry: String,
        source: serde_json::Error,
    },

    /// Zip container failure
    #[error("zip error in {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// Neither a gzip-compressed tar, a zip file nor a directory
    #[error("unrecognized archive format: {}", .0.display())]
    UnknownFormat(PathBuf),

    /// Required document or payload file is absent
    #[error("archive entry missing: {0}")]
    MissingEntry(String),

    /// Container entry would land outside the extraction directory
    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),

    /// Payload file content does not match the recorded hash
    #[error("checksum mismatch for {path} of node {node}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        node: NodeUuid,
        path: String,
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Destination exists and overwrite was not requested
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Archive format version outside the supported set
    #[error("unsupported archive version {found} (supported: {})", supported.join(", "))]
    UnsupportedVersion { found: String, supported: Vec<String> },

    /// Record violates data model rules
    #[error("invalid archive record: {0}")]
    Model(#[from] ModelError),
}

impl ArchiveError {
    /// Wrap an IO error with its path
    #[inline]
    pub fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a JSON error with the entry name
    #[inline]
    pub fn json_error(entry: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            entry: entry.into(),
            source,
        }
    }

    /// Wrap a zip error with its path
    #[inline]
    pub fn zip_error(path: impl AsRef<Path>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
