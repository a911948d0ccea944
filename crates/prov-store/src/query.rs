//! Lookup keys and filters

use prov_model::{ComputerUuid, Link, LinkKind, Node, NodeKind, NodeUuid};

/// Compute endpoints can be looked up by UUID or by store-local name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKey<'a> {
    Uuid(ComputerUuid),
    Name(&'a str),
}

impl From<ComputerUuid> for EndpointKey<'_> {
    fn from(uuid: ComputerUuid) -> Self {
        Self::Uuid(uuid)
    }
}

impl<'a> From<&'a str> for EndpointKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

/// Link direction relative to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// Links whose target is the node
    Incoming,
    /// Links whose source is the node
    Outgoing,
    Both,
}

impl LinkDirection {
    /// Whether `link` touches `node` in this direction
    #[must_use]
    pub fn matches(self, node: NodeUuid, link: &Link) -> bool {
        match self {
            Self::Incoming => link.target == node,
            Self::Outgoing => link.source == node,
            Self::Both => link.target == node || link.source == node,
        }
    }
}

/// Restrict a link query to some kinds; an empty slice means all kinds
#[inline]
#[must_use]
pub fn kind_allowed(kinds: &[LinkKind], kind: LinkKind) -> bool {
    kinds.is_empty() || kinds.contains(&kind)
}

/// Conjunctive node filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    /// Only this node kind
    pub kind: Option<NodeKind>,
    /// Exact type name
    pub type_name: Option<String>,
    /// Owner email
    pub user: Option<String>,
    /// Exact label
    pub label: Option<String>,
}

impl NodeFilter {
    /// Filter matching every node
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: restrict to one kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Builder: restrict to one type name
    #[inline]
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Builder: restrict to one owner
    #[inline]
    #[must_use]
    pub fn with_user(mut self, email: impl Into<String>) -> Self {
        self.user = Some(email.into());
        self
    }

    /// Builder: restrict to one label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Check a node against the filter
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        self.kind.map_or(true, |k| node.kind() == k)
            && self.type_name.as_deref().map_or(true, |t| node.type_name() == t)
            && self.user.as_deref().map_or(true, |u| node.user() == Some(u))
            && self.label.as_deref().map_or(true, |l| node.label() == l)
    }
}
