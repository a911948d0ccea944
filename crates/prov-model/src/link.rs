//! Typed provenance links
//!
//! A [`Link`] is a directed, labelled edge from `source` to `target`. The
//! label is unique per `(target, label)` pair, and the [`LinkKind`] decides
//! which node kinds may sit at either end.

use crate::error::ModelError;
use crate::ids::NodeUuid;
use crate::node::NodeKind;
use serde::{Deserialize, Serialize};

/// Closed set of link kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Data consumed by a process
    Input,
    /// Data produced by a process
    Create,
    /// Data handed back by a workflow
    Return,
    /// Process orchestrating another process
    Call,
}

impl LinkKind {
    /// All kinds, in a stable order
    pub const ALL: [LinkKind; 4] = [Self::Input, Self::Create, Self::Return, Self::Call];

    /// Check that the endpoint kinds are legal for this link kind
    ///
    /// - INPUT: data → process
    /// - CREATE: process → data
    /// - RETURN: workflow → data
    /// - CALL: process → process
    ///
    /// # Errors
    /// Returns [`ModelError::IllegalLink`] otherwise
    pub fn check_endpoints(self, source: NodeKind, target: NodeKind) -> Result<(), ModelError> {
        let legal = match self {
            Self::Input => source == NodeKind::Data && target.is_process(),
            Self::Create => source.is_process() && target == NodeKind::Data,
            Self::Return => source == NodeKind::Workflow && target == NodeKind::Data,
            Self::Call => source.is_process() && target.is_process(),
        };
        if legal {
            Ok(())
        } else {
            Err(ModelError::IllegalLink {
                kind: self,
                source_kind: source,
                target_kind: target,
            })
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Create => write!(f, "create"),
            Self::Return => write!(f, "return"),
            Self::Call => write!(f, "call"),
        }
    }
}

/// Directed labelled link between two nodes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Upstream node
    pub source: NodeUuid,
    /// Downstream node
    pub target: NodeUuid,
    /// Label, unique per target
    pub label: String,
    /// Link type
    pub kind: LinkKind,
}

impl Link {
    /// Create a new link
    #[inline]
    #[must_use]
    pub fn new(source: NodeUuid, target: NodeUuid, label: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            source,
            target,
            label: label.into(),
            kind,
        }
    }

    /// Structural checks that do not need the endpoint nodes
    ///
    /// # Errors
    /// Returns [`ModelError::SelfLink`] or [`ModelError::EmptyLabel`]
    pub fn check_shape(&self) -> Result<(), ModelError> {
        if self.source == self.target {
            return Err(ModelError::SelfLink(self.source));
        }
        if self.label.is_empty() {
            return Err(ModelError::EmptyLabel {
                from: self.source,
                to: self.target,
            });
        }
        Ok(())
    }
}
