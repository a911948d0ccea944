//! Data model validation errors

use crate::ids::NodeUuid;
use crate::link::LinkKind;
use crate::node::NodeKind;

/// Violations of data model invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Link kind does not allow these endpoint kinds
    #[error("{kind} link cannot connect a {source_kind} node to a {target_kind} node")]
    IllegalLink {
        kind: LinkKind,
        source_kind: NodeKind,
        target_kind: NodeKind,
    },

    /// Link from a node to itself
    #[error("node {0} cannot link to itself")]
    SelfLink(NodeUuid),

    /// Link without label
    #[error("link {from} -> {to} has an empty label")]
    EmptyLabel { from: NodeUuid, to: NodeUuid },

    /// Repository path is not a normalized relative path
    #[error("invalid repository path: '{0}'")]
    InvalidFilePath(String),
}
