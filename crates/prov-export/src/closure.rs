//! Graph closure builder
//!
//! Given seed nodes and groups, selects the nodes and links an export must
//! contain so that data lineage can be reconstructed on import:
//!
//! - incoming INPUT and CREATE links are always followed backwards, so data
//!   brings its creator and processes bring their inputs;
//! - with `follow_outputs`, processes also bring the data they CREATE;
//! - RETURN and CALL links never pull in new nodes. CALL links between two
//!   selected nodes are kept; RETURN links follow [`ReturnLinkPolicy`].
//!
//! Traversal is an explicit worklist over an index-addressed node table, so
//! long chains cannot exhaust the stack and cycles terminate.

use crate::error::{ExportError, ExportResult};
use crate::graph::{GroupSnapshot, ProvenanceGraph};
use indexmap::map::Entry as MapEntry;
use indexmap::{IndexMap, IndexSet};
use prov_model::{ComputerUuid, GroupUuid, LinkKind, Node, NodeUuid};
use prov_store::{EndpointKey, EntityKind, LinkDirection, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Export starting point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSeed {
    Node { uuid: NodeUuid, follow_outputs: bool },
    Group { uuid: GroupUuid, follow_outputs: bool },
}

impl ExportSeed {
    /// Node seed that also follows created outputs
    #[inline]
    #[must_use]
    pub fn node(uuid: NodeUuid) -> Self {
        Self::Node {
            uuid,
            follow_outputs: true,
        }
    }

    /// Group seed that also follows created outputs
    #[inline]
    #[must_use]
    pub fn group(uuid: GroupUuid) -> Self {
        Self::Group {
            uuid,
            follow_outputs: true,
        }
    }

    /// Do not pull in data created by processes reached from this seed
    #[must_use]
    pub fn without_outputs(self) -> Self {
        match self {
            Self::Node { uuid, .. } => Self::Node {
                uuid,
                follow_outputs: false,
            },
            Self::Group { uuid, .. } => Self::Group {
                uuid,
                follow_outputs: false,
            },
        }
    }
}

impl From<NodeUuid> for ExportSeed {
    fn from(uuid: NodeUuid) -> Self {
        Self::node(uuid)
    }
}

impl From<GroupUuid> for ExportSeed {
    fn from(uuid: GroupUuid) -> Self {
        Self::group(uuid)
    }
}

/// What to do with RETURN links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnLinkPolicy {
    /// Keep RETURN links whose workflow and data are both selected
    #[default]
    BothEndpointsPresent,
    /// Drop all RETURN links
    Omit,
}

/// Link kinds followed backwards from every selected node
const BACKWARD_KINDS: [LinkKind; 2] = [LinkKind::Input, LinkKind::Create];

/// Link kinds followed forwards from processes when outputs are followed
const FORWARD_KINDS: [LinkKind; 1] = [LinkKind::Create];

struct Visit {
    node: Node,
    follow_outputs: bool,
}

/// Computes the closure of a seed set against a store
pub struct ClosureBuilder<'s, S: Store + ?Sized> {
    store: &'s S,
    return_links: ReturnLinkPolicy,
    table: IndexMap<NodeUuid, Visit>,
    worklist: VecDeque<usize>,
}

impl<'s, S: Store + ?Sized> ClosureBuilder<'s, S> {
    /// New builder over `store`
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            return_links: ReturnLinkPolicy::default(),
            table: IndexMap::new(),
            worklist: VecDeque::new(),
        }
    }

    /// With RETURN link policy
    #[inline]
    #[must_use]
    pub fn with_return_links(mut self, policy: ReturnLinkPolicy) -> Self {
        self.return_links = policy;
        self
    }

    /// Compute the closure
    ///
    /// # Errors
    /// Returns [`ExportError::UnknownSeed`] for seeds missing from the store
    /// and store errors verbatim
    pub fn build(mut self, seeds: &[ExportSeed]) -> ExportResult<ProvenanceGraph> {
        let mut groups: IndexMap<GroupUuid, GroupSnapshot> = IndexMap::new();

        for seed in seeds {
            match *seed {
                ExportSeed::Node {
                    uuid,
                    follow_outputs,
                } => {
                    let node = self.store.get_node(uuid)?.ok_or(ExportError::UnknownSeed {
                        kind: EntityKind::Node,
                        id: uuid.to_string(),
                    })?;
                    self.visit(node, follow_outputs);
                }
                ExportSeed::Group {
                    uuid,
                    follow_outputs,
                } => {
                    let group = self.store.get_group(uuid)?.ok_or(ExportError::UnknownSeed {
                        kind: EntityKind::Group,
                        id: uuid.to_string(),
                    })?;
                    let members = self.store.group_members(uuid)?;
                    tracing::debug!("Group {} expands to {} members", uuid, members.len());
                    for member in &members {
                        let node = self.store.node(*member)?;
                        self.visit(node, follow_outputs);
                    }
                    groups.entry(uuid).or_insert(GroupSnapshot { group, members });
                }
            }
        }

        self.expand()?;
        self.finish(groups.into_values().collect())
    }

    /// Insert a node or upgrade its forward flag; queue it when anything changed
    fn visit(&mut self, node: Node, follow_outputs: bool) {
        match self.table.entry(node.uuid()) {
            MapEntry::Occupied(mut entry) => {
                if follow_outputs && !entry.get().follow_outputs {
                    entry.get_mut().follow_outputs = true;
                    self.worklist.push_back(entry.index());
                }
            }
            MapEntry::Vacant(entry) => {
                let index = entry.index();
                entry.insert(Visit {
                    node,
                    follow_outputs,
                });
                self.worklist.push_back(index);
            }
        }
    }

    /// Whether `uuid` needs a (re)visit with `follow_outputs`
    fn needs_visit(&self, uuid: NodeUuid, follow_outputs: bool) -> bool {
        self.table
            .get(&uuid)
            .map_or(true, |v| follow_outputs && !v.follow_outputs)
    }

    fn expand(&mut self) -> ExportResult<()> {
        while let Some(index) = self.worklist.pop_front() {
            let Some((&uuid, visit)) = self.table.get_index(index) else {
                continue;
            };
            let follow_outputs = visit.follow_outputs;
            let is_process = visit.node.kind().is_process();

            let mut next = Vec::new();
            for link in self
                .store
                .get_links(uuid, LinkDirection::Incoming, &BACKWARD_KINDS)?
            {
                next.push(link.source);
            }
            if follow_outputs && is_process {
                for link in self
                    .store
                    .get_links(uuid, LinkDirection::Outgoing, &FORWARD_KINDS)?
                {
                    next.push(link.target);
                }
            }

            for neighbour in next {
                if self.needs_visit(neighbour, follow_outputs) {
                    let node = match self.table.get(&neighbour) {
                        Some(v) => v.node.clone(),
                        None => self.store.node(neighbour)?,
                    };
                    self.visit(node, follow_outputs);
                }
            }
        }
        Ok(())
    }

    fn finish(self, groups: Vec<GroupSnapshot>) -> ExportResult<ProvenanceGraph> {
        let Self {
            store,
            return_links,
            table,
            ..
        } = self;

        let mut graph = ProvenanceGraph::new();
        let mut emails = IndexSet::new();
        let mut computer_ids: IndexSet<ComputerUuid> = IndexSet::new();
        let uuids: Vec<NodeUuid> = table.keys().copied().collect();

        for visit in table.into_values() {
            if let Some(email) = visit.node.user() {
                emails.insert(email.to_string());
            }
            if let Some(computer) = visit.node.computer() {
                computer_ids.insert(computer);
            }
            graph.add_node(visit.node);
        }

        let mut dropped_returns = 0usize;
        for uuid in &uuids {
            for link in store.get_links(*uuid, LinkDirection::Incoming, &[])? {
                if !graph.contains(link.source) {
                    continue;
                }
                if link.kind == LinkKind::Return && return_links == ReturnLinkPolicy::Omit {
                    dropped_returns += 1;
                    continue;
                }
                graph.add_link(link);
            }
        }

        for mut snapshot in groups {
            snapshot.members.retain(|m| graph.contains(*m));
            if let Some(email) = &snapshot.group.user {
                emails.insert(email.clone());
            }
            graph.push_group(snapshot);
        }

        let mut users = BTreeMap::new();
        for email in emails {
            let user = store.get_user(&email)?.ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::User,
                id: email.clone(),
            })?;
            users.insert(email, user);
        }
        graph.set_users(users.into_values().collect());

        let mut computers = Vec::with_capacity(computer_ids.len());
        for uuid in computer_ids {
            let computer = store
                .get_compute_endpoint(EndpointKey::Uuid(uuid))?
                .ok_or_else(|| StoreError::NotFound {
                    kind: EntityKind::Computer,
                    id: uuid.to_string(),
                })?;
            computers.push(computer);
        }
        graph.set_computers(computers);

        tracing::debug!(
            "Closure: {} nodes, {} links ({} RETURN links omitted), {} groups",
            graph.node_count(),
            graph.link_count(),
            dropped_returns,
            graph.groups().len()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_model::{Link, NewNode};
    use prov_store::{ChangeSet, InMemoryStore};

    #[test]
    fn upgrade_of_forward_flag_revisits_node() {
        // d1 -> c1 -> d2, and c1 also creates d3.
        // First seed reaches c1 without outputs; second seed upgrades it.
        let store = InMemoryStore::new();
        let d1 = NewNode::data("data.int");
        let c1 = NewNode::calculation("calculation.job");
        let d2 = NewNode::data("data.int");
        let d3 = NewNode::data("data.int");
        let ids = (d1.uuid, c1.uuid, d2.uuid, d3.uuid);
        store
            .commit(
                ChangeSet::new()
                    .with_node(d1)
                    .with_node(c1)
                    .with_node(d2)
                    .with_node(d3)
                    .with_link(Link::new(ids.0, ids.1, "x", LinkKind::Input))
                    .with_link(Link::new(ids.1, ids.2, "a", LinkKind::Create))
                    .with_link(Link::new(ids.1, ids.3, "b", LinkKind::Create)),
            )
            .unwrap();

        let narrow = ClosureBuilder::new(&store)
            .build(&[ExportSeed::node(ids.2).without_outputs()])
            .unwrap();
        assert!(!narrow.contains(ids.3));
        assert_eq!(narrow.node_count(), 3);

        let upgraded = ClosureBuilder::new(&store)
            .build(&[ExportSeed::node(ids.2).without_outputs(), ExportSeed::node(ids.0)])
            .unwrap();
        // d1 has no incoming links; nothing reaches c1 forward from d1
        assert!(!upgraded.contains(ids.3));

        let upgraded = ClosureBuilder::new(&store)
            .build(&[ExportSeed::node(ids.2).without_outputs(), ExportSeed::node(ids.1)])
            .unwrap();
        assert!(upgraded.contains(ids.3));
        assert_eq!(upgraded.link_count(), 3);
    }

    #[test]
    fn unknown_seed_is_an_error() {
        let store = InMemoryStore::new();
        let result = ClosureBuilder::new(&store).build(&[ExportSeed::node(NodeUuid::new())]);
        assert!(matches!(result, Err(ExportError::UnknownSeed { .. })));
    }
}
