//! Container formats
//!
//! Archives are either gzip-compressed tar files or zip files. The format is
//! chosen from the destination extension on write and detected from magic
//! bytes on read. Extraction refuses entries that would escape the target
//! directory as well as links and other special entries.

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{DATA_FILE, METADATA_FILE};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: [u8; 4] = *b"PK\x05\x06";

/// Container format of an archive file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// gzip-compressed tar
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Format implied by a destination path: `.zip` means zip, anything else tar.gz
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => Self::Zip,
            _ => Self::TarGz,
        }
    }

    /// Detect the format of an existing archive file from its first bytes
    ///
    /// # Errors
    /// Returns [`ArchiveError::UnknownFormat`] when neither magic matches
    pub fn detect(path: &Path) -> ArchiveResult<Self> {
        let mut file = File::open(path).map_err(|e| ArchiveError::io_error(path, e))?;
        let mut magic = [0u8; 4];
        let mut read = 0;
        while read < magic.len() {
            match file.read(&mut magic[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(ArchiveError::io_error(path, e)),
            }
        }
        if read >= 2 && magic[..2] == GZIP_MAGIC {
            Ok(Self::TarGz)
        } else if read == 4 && (magic == ZIP_MAGIC || magic == ZIP_EMPTY_MAGIC) {
            Ok(Self::Zip)
        } else {
            Err(ArchiveError::UnknownFormat(path.to_path_buf()))
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TarGz => write!(f, "tar.gz"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

/// Normalize a container entry name into a safe relative path
///
/// # Errors
/// Returns [`ArchiveError::UnsafePath`] for absolute paths, `..` segments or
/// names that normalize to nothing
pub fn sanitize_entry_path(name: &str) -> ArchiveResult<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath(name.to_string()));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(ArchiveError::UnsafePath(name.to_string()));
    }
    Ok(clean)
}

/// Files of an archive tree in write order: metadata first, then data, then
/// payloads sorted by path
///
/// # Errors
/// Returns an IO error if the tree cannot be walked
pub(crate) fn tree_entries(root: &Path) -> ArchiveResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort_by(|(a, _), (b, _)| entry_rank(a).cmp(&entry_rank(b)).then_with(|| a.cmp(b)));
    Ok(files)
}

fn entry_rank(name: &str) -> u8 {
    match name {
        METADATA_FILE => 0,
        DATA_FILE => 1,
        _ => 2,
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> ArchiveResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| ArchiveError::io_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io_error(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ArchiveError::io_error(&path, e))?;
        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(root)
                .map_err(|_| ArchiveError::UnsafePath(path.display().to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}

/// Pack a directory tree into `out` using `format`
///
/// # Errors
/// Returns IO or zip errors
pub(crate) fn pack(root: &Path, out: &mut File, out_path: &Path, format: ArchiveFormat) -> ArchiveResult<()> {
    let entries = tree_entries(root)?;
    match format {
        ArchiveFormat::TarGz => pack_tar_gz(&entries, out, out_path),
        ArchiveFormat::Zip => pack_zip(&entries, out, out_path),
    }
}

fn pack_tar_gz(entries: &[(String, PathBuf)], out: &mut File, out_path: &Path) -> ArchiveResult<()> {
    let io_err = |e: io::Error| ArchiveError::io_error(out_path, e);
    let encoder = GzEncoder::new(out, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);
    for (name, path) in entries {
        builder
            .append_path_with_name(path, name)
            .map_err(|e| ArchiveError::io_error(path, e))?;
    }
    let encoder = builder.into_inner().map_err(io_err)?;
    encoder.finish().map_err(io_err)?;
    Ok(())
}

fn pack_zip(entries: &[(String, PathBuf)], out: &mut File, out_path: &Path) -> ArchiveResult<()> {
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    let mut zip = zip::ZipWriter::new(out);
    for (name, path) in entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| ArchiveError::zip_error(out_path, e))?;
        let mut source = File::open(path).map_err(|e| ArchiveError::io_error(path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| ArchiveError::io_error(path, e))?;
    }
    zip.finish().map_err(|e| ArchiveError::zip_error(out_path, e))?;
    Ok(())
}

/// Extract an archive file into `dest`
///
/// # Errors
/// Returns [`ArchiveError::UnsafePath`] for escaping or special entries and
/// IO/zip errors otherwise
pub(crate) fn unpack(archive: &Path, dest: &Path) -> ArchiveResult<()> {
    match ArchiveFormat::detect(archive)? {
        ArchiveFormat::TarGz => unpack_tar_gz(archive, dest),
        ArchiveFormat::Zip => unpack_zip(archive, dest),
    }
}

fn write_entry(dest: &Path, relative: &Path, reader: &mut impl Read) -> ArchiveResult<()> {
    let target = dest.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiveError::io_error(parent, e))?;
    }
    let mut file = File::create(&target).map_err(|e| ArchiveError::io_error(&target, e))?;
    io::copy(reader, &mut file).map_err(|e| ArchiveError::io_error(&target, e))?;
    file.flush().map_err(|e| ArchiveError::io_error(&target, e))
}

fn unpack_tar_gz(archive: &Path, dest: &Path) -> ArchiveResult<()> {
    let file = File::open(archive).map_err(|e| ArchiveError::io_error(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    let entries = tar.entries().map_err(|e| ArchiveError::io_error(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| ArchiveError::io_error(archive, e))?;
        let name = entry
            .path()
            .map_err(|e| ArchiveError::io_error(archive, e))?
            .to_string_lossy()
            .into_owned();
        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                // bare "./" entries are harmless
                if Path::new(&name).components().all(|c| c == Component::CurDir) {
                    continue;
                }
                let relative = sanitize_entry_path(&name)?;
                let dir = dest.join(relative);
                fs::create_dir_all(&dir).map_err(|e| ArchiveError::io_error(&dir, e))?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                let relative = sanitize_entry_path(&name)?;
                write_entry(dest, &relative, &mut entry)?;
            }
            // pax/gnu extension headers are consumed by the tar reader
            tar::EntryType::XGlobalHeader | tar::EntryType::XHeader => {}
            _ => return Err(ArchiveError::UnsafePath(name)),
        }
    }
    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path) -> ArchiveResult<()> {
    let file = File::open(archive).map_err(|e| ArchiveError::io_error(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::zip_error(archive, e))?;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ArchiveError::zip_error(archive, e))?;
        let name = entry.name().to_string();
        if entry.enclosed_name().is_none() {
            return Err(ArchiveError::UnsafePath(name));
        }
        let relative = sanitize_entry_path(&name)?;
        if entry.is_dir() {
            let dir = dest.join(relative);
            fs::create_dir_all(&dir).map_err(|e| ArchiveError::io_error(&dir, e))?;
        } else if entry.is_file() {
            write_entry(dest, &relative, &mut entry)?;
        } else {
            return Err(ArchiveError::UnsafePath(name));
        }
    }
    Ok(())
}

/// Read a single top-level document without extracting the archive
///
/// Tar archives are scanned sequentially; `metadata.json` is written first,
/// so looking it up stops after one entry.
///
/// # Errors
/// Returns [`ArchiveError::MissingEntry`] if the document is absent
pub(crate) fn read_document(archive: &Path, document: &str) -> ArchiveResult<Vec<u8>> {
    if archive.is_dir() {
        let path = archive.join(document);
        if !path.is_file() {
            return Err(ArchiveError::MissingEntry(document.to_string()));
        }
        return fs::read(&path).map_err(|e| ArchiveError::io_error(&path, e));
    }
    match ArchiveFormat::detect(archive)? {
        ArchiveFormat::TarGz => {
            let file = File::open(archive).map_err(|e| ArchiveError::io_error(archive, e))?;
            let mut tar = tar::Archive::new(GzDecoder::new(file));
            let entries = tar.entries().map_err(|e| ArchiveError::io_error(archive, e))?;
            for entry in entries {
                let mut entry = entry.map_err(|e| ArchiveError::io_error(archive, e))?;
                let name = entry
                    .path()
                    .map_err(|e| ArchiveError::io_error(archive, e))?
                    .to_string_lossy()
                    .into_owned();
                if sanitize_entry_path(&name).ok().as_deref() == Some(Path::new(document)) {
                    let mut buf = Vec::new();
                    entry
                        .read_to_end(&mut buf)
                        .map_err(|e| ArchiveError::io_error(archive, e))?;
                    return Ok(buf);
                }
            }
            Err(ArchiveError::MissingEntry(document.to_string()))
        }
        ArchiveFormat::Zip => {
            let file = File::open(archive).map_err(|e| ArchiveError::io_error(archive, e))?;
            let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::zip_error(archive, e))?;
            let mut entry = match zip.by_name(document) {
                Ok(entry) => entry,
                Err(zip::result::ZipError::FileNotFound) => {
                    return Err(ArchiveError::MissingEntry(document.to_string()));
                }
                Err(e) => return Err(ArchiveError::zip_error(archive, e)),
            };
            let mut buf = Vec::new();
            entry
                .read_to_end(&mut buf)
                .map_err(|e| ArchiveError::io_error(archive, e))?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(ArchiveFormat::from_path(Path::new("out.zip")), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_path(Path::new("out.ZIP")), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_path(Path::new("out.aiida")), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_path(Path::new("out.tar.gz")), ArchiveFormat::TarGz);
    }

    #[test]
    fn sanitize_rejects_escapes() {
        assert_eq!(
            sanitize_entry_path("./node_files/a/b.txt").unwrap(),
            PathBuf::from("node_files/a/b.txt")
        );
        for bad in ["../evil", "/etc/passwd", "a/../../b", ".", ""] {
            assert!(
                matches!(sanitize_entry_path(bad), Err(ArchiveError::UnsafePath(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn metadata_sorts_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_files/x")).unwrap();
        fs::write(dir.path().join("node_files/x/a"), b"a").unwrap();
        fs::write(dir.path().join(DATA_FILE), b"{}").unwrap();
        fs::write(dir.path().join(METADATA_FILE), b"{}").unwrap();
        let names: Vec<_> = tree_entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec![METADATA_FILE, DATA_FILE, "node_files/x/a"]);
    }

    #[test]
    fn detect_rejects_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            ArchiveFormat::detect(&path),
            Err(ArchiveError::UnknownFormat(_))
        ));
    }
}
