//! In-memory reference store
//!
//! Backs the test suites and small tools. Commits run against a private copy
//! of the state which is swapped in only when every change applied cleanly,
//! so readers never observe a half-applied [`ChangeSet`].

use crate::changes::{ChangeSet, LinkValidation};
use crate::error::{EntityKind, StoreError, StoreResult};
use crate::query::{kind_allowed, EndpointKey, LinkDirection, NodeFilter};
use crate::store::Store;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use prov_model::{
    Attributes, ComputeEndpoint, ComputerUuid, Group, GroupUuid, Link, LinkKind, Node, NodeUuid,
    User,
};
use std::collections::HashMap;

/// Entity counts, mostly for assertions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Nodes
    pub nodes: usize,
    /// Links
    pub links: usize,
    /// Users
    pub users: usize,
    /// Compute endpoints
    pub computers: usize,
    /// Groups
    pub groups: usize,
    /// Group memberships
    pub memberships: usize,
}

#[derive(Debug, Clone, Default)]
struct State {
    users: IndexMap<String, User>,
    computers: IndexMap<ComputerUuid, ComputeEndpoint>,
    nodes: IndexMap<NodeUuid, Node>,
    links: Vec<Link>,
    /// `(target, label)` → index into `links`
    labels: HashMap<(NodeUuid, String), usize>,
    incoming: HashMap<NodeUuid, Vec<usize>>,
    outgoing: HashMap<NodeUuid, Vec<usize>>,
    groups: IndexMap<GroupUuid, Group>,
    members: HashMap<GroupUuid, IndexSet<NodeUuid>>,
}

impl State {
    fn apply(&mut self, changes: ChangeSet) -> StoreResult<()> {
        for user in changes.users {
            self.insert_user(user)?;
        }
        for computer in changes.computers {
            self.insert_computer(computer)?;
        }
        for node in changes.nodes {
            self.check_owner(node.user.as_deref(), || format!("node {}", node.uuid))?;
            if let Some(computer) = node.computer {
                if !self.computers.contains_key(&computer) {
                    return Err(StoreError::DanglingReference {
                        kind: EntityKind::Computer,
                        id: computer.to_string(),
                        referenced_by: format!("node {}", node.uuid),
                    });
                }
            }
            if self.nodes.contains_key(&node.uuid) {
                return Err(StoreError::DuplicateUuid {
                    kind: EntityKind::Node,
                    id: node.uuid.to_string(),
                });
            }
            self.nodes.insert(node.uuid, Node::stored(node));
        }
        for link in changes.links {
            self.insert_link(link, changes.link_validation)?;
        }
        for group in changes.groups {
            self.check_owner(group.user.as_deref(), || format!("group {}", group.uuid))?;
            if self.groups.contains_key(&group.uuid) {
                return Err(StoreError::DuplicateUuid {
                    kind: EntityKind::Group,
                    id: group.uuid.to_string(),
                });
            }
            self.members.insert(group.uuid, IndexSet::new());
            self.groups.insert(group.uuid, group);
        }
        for (group, node) in changes.memberships {
            if !self.nodes.contains_key(&node) {
                return Err(StoreError::DanglingReference {
                    kind: EntityKind::Node,
                    id: node.to_string(),
                    referenced_by: format!("group {group}"),
                });
            }
            let members = self.members.get_mut(&group).ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Group,
                id: group.to_string(),
            })?;
            members.insert(node);
        }
        Ok(())
    }

    fn insert_user(&mut self, user: User) -> StoreResult<()> {
        if self.users.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        self.users.insert(user.email.clone(), user);
        Ok(())
    }

    fn insert_computer(&mut self, computer: ComputeEndpoint) -> StoreResult<()> {
        if self.computers.contains_key(&computer.uuid) {
            return Err(StoreError::DuplicateUuid {
                kind: EntityKind::Computer,
                id: computer.uuid.to_string(),
            });
        }
        if self.computers.values().any(|c| c.name == computer.name) {
            return Err(StoreError::DuplicateComputerName(computer.name));
        }
        self.computers.insert(computer.uuid, computer);
        Ok(())
    }

    fn insert_link(&mut self, link: Link, validation: LinkValidation) -> StoreResult<()> {
        link.check_shape()?;
        let source = self
            .nodes
            .get(&link.source)
            .ok_or_else(|| StoreError::dangling_link_endpoint(link.source, link.kind, &link.label))?;
        let target = self
            .nodes
            .get(&link.target)
            .ok_or_else(|| StoreError::dangling_link_endpoint(link.target, link.kind, &link.label))?;
        if validation == LinkValidation::Full {
            link.kind.check_endpoints(source.kind(), target.kind())?;
        }

        let key = (link.target, link.label.clone());
        if self.labels.contains_key(&key) {
            return Err(StoreError::DuplicateLinkLabel {
                target: link.target,
                label: link.label,
            });
        }
        let index = self.links.len();
        self.labels.insert(key, index);
        self.incoming.entry(link.target).or_default().push(index);
        self.outgoing.entry(link.source).or_default().push(index);
        self.links.push(link);
        Ok(())
    }

    fn check_owner(&self, email: Option<&str>, referenced_by: impl FnOnce() -> String) -> StoreResult<()> {
        match email {
            Some(email) if !self.users.contains_key(email) => Err(StoreError::DanglingReference {
                kind: EntityKind::User,
                id: email.to_string(),
                referenced_by: referenced_by(),
            }),
            _ => Ok(()),
        }
    }

    fn link_indices(&self, node: NodeUuid, direction: LinkDirection) -> Vec<usize> {
        let pick = |map: &HashMap<NodeUuid, Vec<usize>>| map.get(&node).cloned().unwrap_or_default();
        match direction {
            LinkDirection::Incoming => pick(&self.incoming),
            LinkDirection::Outgoing => pick(&self.outgoing),
            LinkDirection::Both => {
                let mut all = pick(&self.incoming);
                all.extend(pick(&self.outgoing));
                all.sort_unstable();
                all
            }
        }
    }
}

/// Thread-safe in-memory [`Store`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entity counts
    #[must_use]
    pub fn counts(&self) -> StoreCounts {
        let state = self.state.read();
        StoreCounts {
            nodes: state.nodes.len(),
            links: state.links.len(),
            users: state.users.len(),
            computers: state.computers.len(),
            groups: state.groups.len(),
            memberships: state.members.values().map(IndexSet::len).sum(),
        }
    }

    /// Every link, in creation order
    #[must_use]
    pub fn all_links(&self) -> Vec<Link> {
        self.state.read().links.clone()
    }
}

impl Store for InMemoryStore {
    fn get_node(&self, uuid: NodeUuid) -> StoreResult<Option<Node>> {
        Ok(self.state.read().nodes.get(&uuid).cloned())
    }

    fn query_nodes(&self, filter: &NodeFilter) -> StoreResult<Vec<Node>> {
        Ok(self
            .state
            .read()
            .nodes
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    fn get_links(
        &self,
        node: NodeUuid,
        direction: LinkDirection,
        kinds: &[LinkKind],
    ) -> StoreResult<Vec<Link>> {
        let state = self.state.read();
        Ok(state
            .link_indices(node, direction)
            .into_iter()
            .map(|i| &state.links[i])
            .filter(|l| kind_allowed(kinds, l.kind))
            .cloned()
            .collect())
    }

    fn get_user(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.state.read().users.get(email).cloned())
    }

    fn get_compute_endpoint(&self, key: EndpointKey<'_>) -> StoreResult<Option<ComputeEndpoint>> {
        let state = self.state.read();
        Ok(match key {
            EndpointKey::Uuid(uuid) => state.computers.get(&uuid).cloned(),
            EndpointKey::Name(name) => state.computers.values().find(|c| c.name == name).cloned(),
        })
    }

    fn list_compute_endpoints(&self) -> StoreResult<Vec<ComputeEndpoint>> {
        Ok(self.state.read().computers.values().cloned().collect())
    }

    fn get_group(&self, uuid: GroupUuid) -> StoreResult<Option<Group>> {
        Ok(self.state.read().groups.get(&uuid).cloned())
    }

    fn group_members(&self, group: GroupUuid) -> StoreResult<Vec<NodeUuid>> {
        self.state
            .read()
            .members
            .get(&group)
            .map(|m| m.iter().copied().collect())
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Group,
                id: group.to_string(),
            })
    }

    fn update_extras(&self, uuid: NodeUuid, extras: Attributes) -> StoreResult<Node> {
        let mut state = self.state.write();
        let node = state
            .nodes
            .get_mut(&uuid)
            .ok_or_else(|| StoreError::node_not_found(uuid))?;
        *node = node.clone().with_extras(extras);
        Ok(node.clone())
    }

    fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let count = changes.len();
        let mut state = self.state.write();
        let mut staged = state.clone();
        staged.apply(changes)?;
        *state = staged;
        tracing::debug!("Committed {} changes", count);
        Ok(())
    }
}
