//! Archive reading

use crate::container::{read_document, sanitize_entry_path, unpack};
use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{payload_entry, ArchiveData, ArchiveMetadata, NodeRecord, DATA_FILE, METADATA_FILE};
use crate::version::check_version;
use prov_model::{ContentHash, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Read only the metadata document of an archive file or tree
///
/// Does not extract the archive and does not check the version.
///
/// # Errors
/// Returns [`ArchiveError::MissingEntry`] if there is no metadata document
pub fn inspect_archive(path: &Path) -> ArchiveResult<ArchiveMetadata> {
    let bytes = read_document(path, METADATA_FILE)?;
    serde_json::from_slice(&bytes).map_err(|e| ArchiveError::json_error(METADATA_FILE, e))
}

/// Opened archive, extracted into a scratch directory
///
/// The scratch directory lives as long as the reader. Directories produced by
/// [`export_tree`](crate::export_tree) are read in place.
#[derive(Debug)]
pub struct ArchiveReader {
    root: PathBuf,
    metadata: ArchiveMetadata,
    _scratch: Option<TempDir>,
}

impl ArchiveReader {
    /// Open an archive, passing it through the version gate first
    ///
    /// The metadata document is read and checked before anything is
    /// extracted or parsed.
    ///
    /// # Errors
    /// Returns [`ArchiveError::UnsupportedVersion`] for unsupported archives,
    /// container errors otherwise
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let metadata = inspect_archive(path)?;
        check_version(&metadata)?;

        if path.is_dir() {
            return Ok(Self {
                root: path.to_path_buf(),
                metadata,
                _scratch: None,
            });
        }

        let scratch = tempfile::tempdir().map_err(|e| ArchiveError::io_error(std::env::temp_dir(), e))?;
        unpack(path, scratch.path())?;
        tracing::debug!("Extracted {} into {}", path.display(), scratch.path().display());
        Ok(Self {
            root: scratch.path().to_path_buf(),
            metadata,
            _scratch: Some(scratch),
        })
    }

    /// Metadata document, already version-checked
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// Parse the data document
    ///
    /// # Errors
    /// Returns [`ArchiveError::MissingEntry`] or [`ArchiveError::Json`]
    pub fn read_data(&self) -> ArchiveResult<ArchiveData> {
        let path = self.root.join(DATA_FILE);
        if !path.is_file() {
            return Err(ArchiveError::MissingEntry(DATA_FILE.to_string()));
        }
        let bytes = fs::read(&path).map_err(|e| ArchiveError::io_error(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ArchiveError::json_error(DATA_FILE, e))
    }

    /// Load the payload files listed in a node record
    ///
    /// # Errors
    /// Returns [`ArchiveError::MissingEntry`] for absent files and
    /// [`ArchiveError::ChecksumMismatch`] when `verify` is on and a hash
    /// differs
    pub fn load_repository(&self, record: &NodeRecord, verify: bool) -> ArchiveResult<Repository> {
        let mut repository = Repository::new();
        for (path, expected) in &record.files {
            let entry = payload_entry(record.uuid, path);
            let relative = sanitize_entry_path(&entry)?;
            let full = self.root.join(relative);
            if !full.is_file() {
                return Err(ArchiveError::MissingEntry(entry));
            }
            let content = fs::read(&full).map_err(|e| ArchiveError::io_error(&full, e))?;
            if verify {
                let actual = ContentHash::compute(&content);
                if actual != *expected {
                    return Err(ArchiveError::ChecksumMismatch {
                        node: record.uuid,
                        path: path.clone(),
                        expected: *expected,
                        actual,
                    });
                }
            }
            repository.insert(path.clone(), content)?;
        }
        Ok(repository)
    }
}
