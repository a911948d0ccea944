//! Import entry point

use crate::error::ImportResult;
use crate::merger::ImportMerger;
use crate::options::{ImportContext, ImportOptions};
use crate::plan::ImportSummary;
use crate::resolver::IdentityResolver;
use prov_archive::ArchiveReader;
use prov_store::Store;
use std::path::Path;

/// Merge the archive at `path` into `store`
///
/// The archive may be a file in either container format or a directory
/// written by `export_tree`. The version gate runs before the data document
/// is parsed; the store is modified by a single commit at the very end.
///
/// # Errors
/// - [`ArchiveError::UnsupportedVersion`](prov_archive::ArchiveError::UnsupportedVersion)
///   before anything is read
/// - [`ImportError::UnknownNode`](crate::ImportError::UnknownNode) unless
///   `options.ignore_unknown_nodes`
/// - archive integrity and store failures
pub fn import_archive<S: Store + ?Sized>(
    store: &S,
    path: &Path,
    context: &ImportContext,
    options: &ImportOptions,
) -> ImportResult<ImportSummary> {
    tracing::info!("Importing {}", path.display());
    let reader = ArchiveReader::open(path)?;
    let data = reader.read_data()?;

    let plan = IdentityResolver::new(store, context)
        .with_ignore_unknown_nodes(options.ignore_unknown_nodes)
        .resolve(data)?;
    if !plan.dropped_links.is_empty() || !plan.dropped_memberships.is_empty() {
        tracing::warn!(
            "Dropped {} links and {} group memberships referencing unknown nodes",
            plan.dropped_links.len(),
            plan.dropped_memberships.len()
        );
    }

    let verify = options.verify_checksums;
    let summary = ImportMerger::new(store).apply(plan, |record| reader.load_repository(record, verify))?;

    tracing::info!(
        "Imported {}: {} new nodes ({} existing), {} new links, {} new users, {} new computers ({} renamed), {} new groups",
        path.display(),
        summary.nodes.created,
        summary.nodes.existing,
        summary.links.created,
        summary.users.created,
        summary.computers.created,
        summary.renamed_computers.len(),
        summary.groups.created
    );
    Ok(summary)
}
