//! PROV Archive Codec
//!
//! Reads and writes portable provenance archives.
//!
//! # Overview
//!
//! - **Layout**: `metadata.json`, `data.json`, `node_files/<uuid>/...`
//! - **Containers**: gzip-compressed tar (default) or zip, detected on read
//! - **Atomic writes**: staged in scratch space, persisted in one step
//! - **Version gate**: metadata is checked before any data is parsed
//! - **Integrity**: payload hashes are verified on load; escaping entry
//!   paths are rejected on extraction
//!
//! # Example
//!
//! ```rust,ignore
//! use prov_archive::{write_archive, ArchiveContents, ArchiveReader, WriteOptions};
//!
//! let written = write_archive(&contents, Path::new("export.aiida"), WriteOptions::default())?;
//! let reader = ArchiveReader::open(&written.path)?;
//! let data = reader.read_data()?;
//! ```

pub mod container;
pub mod error;
pub mod format;
pub mod reader;
pub mod version;
pub mod writer;

pub use container::{sanitize_entry_path, ArchiveFormat};
pub use error::{ArchiveError, ArchiveResult};
pub use format::{
    payload_entry, ArchiveContents, ArchiveData, ArchiveMetadata, EntityCounts, GroupRecord,
    NodeRecord, DATA_FILE, METADATA_FILE, NODE_FILES_DIR,
};
pub use reader::{inspect_archive, ArchiveReader};
pub use version::{check_version, FormatVersion, CURRENT_VERSION, SUPPORTED_VERSIONS};
pub use writer::{export_tree, pack_directory, write_archive, WriteOptions, WrittenArchive};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
