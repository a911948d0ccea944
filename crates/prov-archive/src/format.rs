//! Archive layout and record types
//!
//! An archive is a flat relational snapshot:
//!
//! ```text
//! metadata.json              format version, timestamps, entity counts
//! data.json                  node, link, group, user and computer records
//! node_files/<uuid>/<path>   payload files per node
//! ```
//!
//! Records reference each other only through global keys (node and computer
//! UUIDs, user emails), never through store-local identifiers.

use crate::version::FormatVersion;
use chrono::{DateTime, Utc};
use prov_model::{
    Attributes, ComputeEndpoint, ComputerUuid, ContentHash, Group, Link, NewNode, Node, NodeKind,
    NodeUuid, Repository, User,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the metadata document
pub const METADATA_FILE: &str = "metadata.json";
/// Name of the data document
pub const DATA_FILE: &str = "data.json";
/// Directory holding per-node payload trees
pub const NODE_FILES_DIR: &str = "node_files";

/// Relative location of a payload file inside the archive tree
#[must_use]
pub fn payload_entry(node: NodeUuid, path: &str) -> String {
    format!("{NODE_FILES_DIR}/{node}/{path}")
}

/// Entity count summary stored in the metadata document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    /// Nodes in `data.json`
    pub nodes: usize,
    /// Links in `data.json`
    pub links: usize,
    /// Groups in `data.json`
    pub groups: usize,
    /// Users in `data.json`
    pub users: usize,
    /// Compute endpoints in `data.json`
    pub computers: usize,
    /// Payload files across all nodes
    pub files: usize,
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Format version, checked before anything else is parsed
    pub export_version: FormatVersion,
    /// When the archive was written
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    /// Name and version of the writing tool
    #[serde(default)]
    pub producer: String,
    /// Entity counts
    #[serde(default)]
    pub counts: EntityCounts,
}

impl ArchiveMetadata {
    /// Metadata for a fresh export at the current format version
    #[must_use]
    pub fn current(counts: EntityCounts) -> Self {
        Self {
            export_version: FormatVersion::current(),
            exported_at: Some(Utc::now()),
            producer: concat!("prov-archive/", env!("CARGO_PKG_VERSION")).to_string(),
            counts,
        }
    }
}

/// One node in `data.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Global node identity
    pub uuid: NodeUuid,
    /// Data or process
    pub kind: NodeKind,
    /// Dotted type name, e.g. `data.int`
    pub type_name: String,
    /// Free-form label
    #[serde(default)]
    pub label: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Creation time
    pub ctime: DateTime<Utc>,
    /// Last modification time
    pub mtime: DateTime<Utc>,
    /// Owner email
    #[serde(default)]
    pub user: Option<String>,
    /// Compute endpoint of a calculation
    #[serde(default)]
    pub computer: Option<ComputerUuid>,
    /// Immutable attributes
    #[serde(default)]
    pub attributes: Attributes,
    /// Mutable extras
    #[serde(default)]
    pub extras: Attributes,
    /// Payload path → content hash
    #[serde(default)]
    pub files: BTreeMap<String, ContentHash>,
}

impl NodeRecord {
    /// Snapshot a stored node
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        Self {
            uuid: node.uuid(),
            kind: node.kind(),
            type_name: node.type_name().to_string(),
            label: node.label().to_string(),
            description: node.description().to_string(),
            ctime: node.ctime(),
            mtime: node.mtime(),
            user: node.user().map(str::to_string),
            computer: node.computer(),
            attributes: node.attributes().clone(),
            extras: node.extras().clone(),
            files: node
                .repository()
                .iter()
                .map(|(path, content)| (path.to_string(), ContentHash::compute(content)))
                .collect(),
        }
    }

    /// Rebuild a transient node, keeping UUID and timestamps
    #[must_use]
    pub fn into_new_node(self, repository: Repository) -> NewNode {
        let mut node = NewNode::new(self.kind, self.type_name)
            .with_uuid(self.uuid)
            .with_label(self.label)
            .with_description(self.description)
            .with_repository(repository);
        node.attributes = self.attributes;
        node.extras = self.extras;
        node.user = self.user;
        node.computer = self.computer;
        node.ctime = self.ctime;
        node.mtime = self.mtime;
        node
    }
}

/// One group in `data.json`, with its member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group itself
    #[serde(flatten)]
    pub group: Group,
    /// Member UUIDs in insertion order
    #[serde(default)]
    pub members: Vec<NodeUuid>,
}

/// Contents of `data.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveData {
    /// Node records
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Links between exported nodes
    #[serde(default)]
    pub links: Vec<Link>,
    /// Groups with their members
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    /// Users referenced by nodes or groups
    #[serde(default)]
    pub users: Vec<User>,
    /// Compute endpoints referenced by calculations
    #[serde(default)]
    pub computers: Vec<ComputeEndpoint>,
}

impl ArchiveData {
    /// Count summary for the metadata document
    #[must_use]
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            nodes: self.nodes.len(),
            links: self.links.len(),
            groups: self.groups.len(),
            users: self.users.len(),
            computers: self.computers.len(),
            files: self.nodes.iter().map(|n| n.files.len()).sum(),
        }
    }
}

/// Everything an export writes: both documents plus payloads
#[derive(Debug, Clone)]
pub struct ArchiveContents {
    /// `metadata.json`
    pub metadata: ArchiveMetadata,
    /// `data.json`
    pub data: ArchiveData,
    /// Payload files per node
    pub payloads: BTreeMap<NodeUuid, Repository>,
}

impl ArchiveContents {
    /// Assemble contents at the current format version
    ///
    /// Only nodes with a non-empty repository need a payload entry.
    #[must_use]
    pub fn new(data: ArchiveData, payloads: BTreeMap<NodeUuid, Repository>) -> Self {
        Self {
            metadata: ArchiveMetadata::current(data.counts()),
            data,
            payloads,
        }
    }
}
