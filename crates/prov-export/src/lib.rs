//! PROV Export
//!
//! Selects a self-consistent provenance subgraph and writes it as an archive.
//!
//! # Overview
//!
//! 1. [`ClosureBuilder`] expands seed nodes and groups along INPUT and
//!    CREATE links into a [`ProvenanceGraph`]
//! 2. [`LicensePolicy`] vets every node; one failure aborts the export
//! 3. [`export`] flattens the graph into archive records and writes the file
//!    atomically
//!
//! # Example
//!
//! ```rust,ignore
//! use prov_export::{export, ExportOptions, ExportSeed, LicensePolicy};
//!
//! let options = ExportOptions::default()
//!     .with_license(LicensePolicy::new().allow(["CC0", "GPL"]));
//! let report = export(&store, &[ExportSeed::node(uuid)], Path::new("out.aiida"), &options)?;
//! println!("{} nodes", report.counts.nodes);
//! ```

pub mod closure;
pub mod error;
pub mod exporter;
pub mod graph;
pub mod license;
pub mod options;

pub use closure::{ClosureBuilder, ExportSeed, ReturnLinkPolicy};
pub use error::{ExportError, ExportResult};
pub use exporter::{export, export_tree, select, to_contents, ExportReport};
pub use graph::{GroupSnapshot, ProvenanceGraph};
pub use license::{
    LicensePolicy, LicensePredicate, LicenseRule, LicensingError, PolicySide, PredicateError,
};
pub use options::ExportOptions;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
