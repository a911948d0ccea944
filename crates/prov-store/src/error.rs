//! Store error types

use prov_model::{LinkKind, ModelError, NodeUuid};
use std::fmt;

/// Entity categories known to a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Node,
    Link,
    User,
    Computer,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::Link => "link",
            Self::User => "user",
            Self::Computer => "computer",
            Self::Group => "group",
        };
        f.write_str(name)
    }
}

/// Errors raised by store operations
///
/// Every variant is fatal to the export or import call that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Requested entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Entity with this UUID already stored
    #[error("{kind} already exists: {id}")]
    DuplicateUuid { kind: EntityKind, id: String },

    /// User email already taken
    #[error("user already exists: {0}")]
    DuplicateEmail(String),

    /// Computer name already taken in this store
    #[error("computer name already in use: {0}")]
    DuplicateComputerName(String),

    /// `(target, label)` pair already used by another link
    #[error("node {target} already has an incoming link labelled '{label}'")]
    DuplicateLinkLabel { target: NodeUuid, label: String },

    /// Link or payload rejected by data model rules
    #[error("invalid entity: {0}")]
    Invalid(#[from] ModelError),

    /// Reference to an entity that is neither stored nor part of the change set
    #[error("{referenced_by} references unknown {kind} {id}")]
    DanglingReference {
        kind: EntityKind,
        id: String,
        referenced_by: String,
    },

    /// Backend-specific failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Not-found error for a node
    #[inline]
    #[must_use]
    pub fn node_not_found(uuid: NodeUuid) -> Self {
        Self::NotFound {
            kind: EntityKind::Node,
            id: uuid.to_string(),
        }
    }

    /// Dangling link endpoint
    #[must_use]
    pub fn dangling_link_endpoint(missing: NodeUuid, kind: LinkKind, label: &str) -> Self {
        Self::DanglingReference {
            kind: EntityKind::Node,
            id: missing.to_string(),
            referenced_by: format!("{kind} link '{label}'"),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
