//! PROV Import
//!
//! Merges a provenance archive into a possibly non-empty store without
//! duplicating or corrupting what is already there.
//!
//! # Overview
//!
//! 1. The archive passes the version gate before its data is parsed
//! 2. [`IdentityResolver`] maps every record to an existing entity or a new
//!    one, renaming colliding computers
//! 3. [`ImportMerger`] creates the new entities in one atomic commit
//!
//! Importing the same archive twice changes nothing the second time.
//!
//! # Example
//!
//! ```rust,ignore
//! use prov_import::{import_archive, ImportContext, ImportOptions};
//!
//! let ctx = ImportContext::new("me@example.org");
//! let summary = import_archive(&store, Path::new("export.aiida"), &ctx, &ImportOptions::default())?;
//! println!("{} new nodes", summary.nodes.created);
//! ```

pub mod error;
pub mod importer;
pub mod merger;
pub mod options;
pub mod plan;
pub mod resolver;

pub use error::{ImportError, ImportResult};
pub use importer::import_archive;
pub use merger::ImportMerger;
pub use options::{ImportContext, ImportOptions};
pub use plan::{ComputerRename, ImportPlan, ImportSummary, Membership, Resolution, Tally};
pub use resolver::IdentityResolver;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
