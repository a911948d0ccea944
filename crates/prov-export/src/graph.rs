//! In-memory closure snapshot
//!
//! [`ProvenanceGraph`] is an export-local copy of the selected subgraph. It
//! owns clones of the nodes and has no back-reference to the store it came
//! from.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use prov_model::{ComputeEndpoint, Group, Link, LinkKind, Node, NodeUuid, User};
use std::collections::HashMap;

/// Group selected for export with its in-closure members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Group itself
    pub group: Group,
    /// Members that are part of the closure
    pub members: Vec<NodeUuid>,
}

/// Closure of an export: nodes, links and the shared entities they reference
#[derive(Debug, Clone, Default)]
pub struct ProvenanceGraph {
    graph: DiGraph<Node, Link>,
    index: HashMap<NodeUuid, NodeIndex>,
    groups: Vec<GroupSnapshot>,
    users: Vec<User>,
    computers: Vec<ComputeEndpoint>,
}

impl ProvenanceGraph {
    /// Empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns false if it was already present
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.uuid()) {
            return false;
        }
        let uuid = node.uuid();
        let idx = self.graph.add_node(node);
        self.index.insert(uuid, idx);
        true
    }

    /// Add a link between two nodes already in the snapshot
    ///
    /// Returns false if either endpoint is missing.
    pub fn add_link(&mut self, link: Link) -> bool {
        match (self.index.get(&link.source), self.index.get(&link.target)) {
            (Some(&s), Some(&t)) => {
                self.graph.add_edge(s, t, link);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn push_group(&mut self, group: GroupSnapshot) {
        self.groups.push(group);
    }

    pub(crate) fn set_users(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub(crate) fn set_computers(&mut self, computers: Vec<ComputeEndpoint>) {
        self.computers = computers;
    }

    /// Whether `uuid` is part of the snapshot
    #[inline]
    #[must_use]
    pub fn contains(&self, uuid: NodeUuid) -> bool {
        self.index.contains_key(&uuid)
    }

    /// Node by UUID
    #[must_use]
    pub fn node(&self, uuid: NodeUuid) -> Option<&Node> {
        self.index.get(&uuid).map(|&i| &self.graph[i])
    }

    /// Nodes in discovery order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Node UUIDs in discovery order
    pub fn node_uuids(&self) -> impl Iterator<Item = NodeUuid> + '_ {
        self.graph.node_weights().map(Node::uuid)
    }

    /// Links in insertion order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.graph.edge_weights()
    }

    /// Links of one kind
    pub fn links_of_kind(&self, kind: LinkKind) -> impl Iterator<Item = &Link> {
        self.links().filter(move |l| l.kind == kind)
    }

    /// Links arriving at `uuid` inside the snapshot
    #[must_use]
    pub fn incoming(&self, uuid: NodeUuid) -> Vec<&Link> {
        self.index.get(&uuid).map_or_else(Vec::new, |&i| {
            self.graph
                .edges_directed(i, Direction::Incoming)
                .map(|e| e.weight())
                .collect()
        })
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of links
    #[inline]
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Groups selected as seeds
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[GroupSnapshot] {
        &self.groups
    }

    /// Users owning exported nodes or groups
    #[inline]
    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Compute endpoints of exported calculations
    #[inline]
    #[must_use]
    pub fn computers(&self) -> &[ComputeEndpoint] {
        &self.computers
    }
}
