//! Export entry points

use crate::closure::{ClosureBuilder, ExportSeed};
use crate::error::{ExportError, ExportResult};
use crate::graph::ProvenanceGraph;
use crate::options::ExportOptions;
use prov_archive::{
    export_tree as write_tree, write_archive, ArchiveContents, ArchiveData, ArchiveError,
    ArchiveFormat, EntityCounts, GroupRecord, NodeRecord, WriteOptions,
};
use prov_store::Store;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Final location
    pub path: PathBuf,
    /// Container format used
    pub format: ArchiveFormat,
    /// Entities written
    pub counts: EntityCounts,
    /// Bytes written
    pub size_bytes: u64,
}

/// Compute the closure of `seeds` and vet it against the license policy
///
/// # Errors
/// Returns [`ExportError::Licensing`] for the first rejected node
pub fn select<S: Store + ?Sized>(
    store: &S,
    seeds: &[ExportSeed],
    options: &ExportOptions,
) -> ExportResult<ProvenanceGraph> {
    let graph = ClosureBuilder::new(store)
        .with_return_links(options.return_links)
        .build(seeds)?;
    options.license.check_graph(&graph)?;
    Ok(graph)
}

/// Flatten a closure into archive records and payloads
#[must_use]
pub fn to_contents(graph: &ProvenanceGraph) -> ArchiveContents {
    let mut payloads = BTreeMap::new();
    let nodes = graph
        .nodes()
        .map(|node| {
            if !node.repository().is_empty() {
                payloads.insert(node.uuid(), node.repository().clone());
            }
            NodeRecord::from_node(node)
        })
        .collect();

    let data = ArchiveData {
        nodes,
        links: graph.links().cloned().collect(),
        groups: graph
            .groups()
            .iter()
            .map(|g| GroupRecord {
                group: g.group.clone(),
                members: g.members.clone(),
            })
            .collect(),
        users: graph.users().to_vec(),
        computers: graph.computers().to_vec(),
    };
    ArchiveContents::new(data, payloads)
}

/// Export the closure of `seeds` into a single archive file at `dest`
///
/// Nothing is written unless the whole closure passes the license policy.
///
/// # Errors
/// - [`ExportError::Archive`] with `DestinationExists` if `dest` exists and
///   overwrite is off (checked before traversal)
/// - [`ExportError::Licensing`] naming the first rejected node
/// - store and archive errors verbatim
pub fn export<S: Store + ?Sized>(
    store: &S,
    seeds: &[ExportSeed],
    dest: &Path,
    options: &ExportOptions,
) -> ExportResult<ExportReport> {
    if dest.exists() && !options.overwrite {
        return Err(ArchiveError::DestinationExists(dest.to_path_buf()).into());
    }
    tracing::info!("Exporting {} seeds to {}", seeds.len(), dest.display());

    let graph = select(store, seeds, options)?;
    let contents = to_contents(&graph);
    let counts = contents.metadata.counts;

    let write_options = WriteOptions {
        overwrite: options.overwrite,
        format: options.format,
    };
    let written = write_archive(&contents, dest, write_options)?;

    tracing::info!(
        "Exported {} nodes, {} links, {} groups, {} users, {} computers to {}",
        counts.nodes,
        counts.links,
        counts.groups,
        counts.users,
        counts.computers,
        written.path.display()
    );
    Ok(ExportReport {
        path: written.path,
        format: written.format,
        counts,
        size_bytes: written.size_bytes,
    })
}

/// Export the closure of `seeds` as an uncompressed archive tree in `dir`
///
/// # Errors
/// Same as [`export`]; `dir` must not already contain an archive
pub fn export_tree<S: Store + ?Sized>(
    store: &S,
    seeds: &[ExportSeed],
    dir: &Path,
    options: &ExportOptions,
) -> ExportResult<EntityCounts> {
    let graph = select(store, seeds, options)?;
    let contents = to_contents(&graph);
    write_tree(&contents, dir).map_err(ExportError::from)?;
    tracing::info!(
        "Exported {} nodes as a tree to {}",
        contents.metadata.counts.nodes,
        dir.display()
    );
    Ok(contents.metadata.counts)
}
