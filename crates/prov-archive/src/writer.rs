//! Archive writing
//!
//! Every export is staged as a plain directory tree first ([`export_tree`]),
//! then packed into a temporary file next to the destination and moved into
//! place only once complete. A failed write leaves nothing at the
//! destination; scratch space is released on every exit path.

use crate::container::{pack, ArchiveFormat};
use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{payload_entry, ArchiveContents, DATA_FILE, METADATA_FILE};
use prov_model::validate_relative_path;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// How to write an archive file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace an existing destination
    pub overwrite: bool,
    /// Container format; inferred from the destination extension when unset
    pub format: Option<ArchiveFormat>,
}

impl WriteOptions {
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
}

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArchive {
    /// Final location
    pub path: PathBuf,
    /// Container format used
    pub format: ArchiveFormat,
    /// Bytes written
    pub size_bytes: u64,
}

/// Write the uncompressed archive layout into `dir`
///
/// `dir` is created if needed and must not already contain an archive.
///
/// # Errors
/// Returns [`ArchiveError::DestinationExists`] if `dir` already holds a
/// metadata document, IO errors otherwise
pub fn export_tree(contents: &ArchiveContents, dir: &Path) -> ArchiveResult<()> {
    fs::create_dir_all(dir).map_err(|e| ArchiveError::io_error(dir, e))?;
    let metadata_path = dir.join(METADATA_FILE);
    if metadata_path.exists() {
        return Err(ArchiveError::DestinationExists(dir.to_path_buf()));
    }

    let metadata = serde_json::to_vec_pretty(&contents.metadata)
        .map_err(|e| ArchiveError::json_error(METADATA_FILE, e))?;
    fs::write(&metadata_path, metadata).map_err(|e| ArchiveError::io_error(&metadata_path, e))?;

    let data = serde_json::to_vec(&contents.data).map_err(|e| ArchiveError::json_error(DATA_FILE, e))?;
    let data_path = dir.join(DATA_FILE);
    fs::write(&data_path, data).map_err(|e| ArchiveError::io_error(&data_path, e))?;

    for (node, repository) in &contents.payloads {
        for (path, content) in repository.iter() {
            validate_relative_path(path)?;
            let target = dir.join(payload_entry(*node, path));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::io_error(parent, e))?;
            }
            fs::write(&target, content).map_err(|e| ArchiveError::io_error(&target, e))?;
        }
    }

    tracing::debug!(
        "Staged archive tree at {} ({} nodes, {} files)",
        dir.display(),
        contents.metadata.counts.nodes,
        contents.metadata.counts.files
    );
    Ok(())
}

/// Write `contents` as a single archive file at `dest`
///
/// # Errors
/// Returns [`ArchiveError::DestinationExists`] when `dest` exists and
/// overwrite is off; IO, JSON or zip errors otherwise
pub fn write_archive(
    contents: &ArchiveContents,
    dest: &Path,
    options: WriteOptions,
) -> ArchiveResult<WrittenArchive> {
    if dest.exists() && !options.overwrite {
        return Err(ArchiveError::DestinationExists(dest.to_path_buf()));
    }
    let staging = tempfile::tempdir().map_err(|e| ArchiveError::io_error(std::env::temp_dir(), e))?;
    export_tree(contents, staging.path())?;
    let format = options.format.unwrap_or_else(|| ArchiveFormat::from_path(dest));
    pack_directory(staging.path(), dest, format, options.overwrite)
}

/// Pack an archive tree produced by [`export_tree`] into a file
///
/// # Errors
/// Returns [`ArchiveError::DestinationExists`] if `dest` appears while
/// packing and overwrite is off
pub fn pack_directory(
    dir: &Path,
    dest: &Path,
    format: ArchiveFormat,
    overwrite: bool,
) -> ArchiveResult<WrittenArchive> {
    if !dir.join(METADATA_FILE).is_file() {
        return Err(ArchiveError::MissingEntry(METADATA_FILE.to_string()));
    }
    if dest.exists() && !overwrite {
        return Err(ArchiveError::DestinationExists(dest.to_path_buf()));
    }

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| ArchiveError::io_error(&parent, e))?;
    pack(dir, tmp.as_file_mut(), dest, format)?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ArchiveError::io_error(tmp.path(), e))?;

    let persisted = if overwrite {
        tmp.persist(dest)
    } else {
        tmp.persist_noclobber(dest)
    };
    let file = persisted.map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            ArchiveError::DestinationExists(dest.to_path_buf())
        } else {
            ArchiveError::io_error(dest, e.error)
        }
    })?;
    let size_bytes = file
        .metadata()
        .map_err(|e| ArchiveError::io_error(dest, e))?
        .len();

    tracing::info!(
        "Wrote {} archive {} ({} bytes)",
        format,
        dest.display(),
        size_bytes
    );
    Ok(WrittenArchive {
        path: dest.to_path_buf(),
        format,
        size_bytes,
    })
}
