//! Batched store mutations
//!
//! A [`ChangeSet`] collects every entity an operation wants to create and is
//! handed to [`Store::commit`](crate::Store::commit) in one piece. Stores apply
//! it in dependency order (users, computers, nodes, links, groups,
//! memberships) and either keep all of it or none of it.
//!
//! Links normally have to satisfy the link-kind table as well as the
//! structural rules. [`LinkValidation::Structural`] drops the kind table for
//! records that were validated by whoever produced them, such as archive
//! imports.

use prov_model::{ComputeEndpoint, Group, GroupUuid, Link, NewNode, NodeUuid, User};

/// How strictly a commit checks its links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkValidation {
    /// Structural rules plus the link-kind table
    #[default]
    Full,
    /// Non-empty label, no self link, both endpoints stored, unique
    /// `(target, label)`
    Structural,
}

/// Pending creations, applied atomically
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Users to create
    pub users: Vec<User>,
    /// Compute endpoints to create
    pub computers: Vec<ComputeEndpoint>,
    /// Nodes to create
    pub nodes: Vec<NewNode>,
    /// Links to create
    pub links: Vec<Link>,
    /// Groups to create
    pub groups: Vec<Group>,
    /// `(group, node)` pairs to add
    pub memberships: Vec<(GroupUuid, NodeUuid)>,
    /// Checks applied to `links`
    pub link_validation: LinkValidation,
}

impl ChangeSet {
    /// Empty change set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a user for creation
    pub fn add_user(&mut self, user: User) {
        self.users.push(user);
    }

    /// Queue a compute endpoint for creation
    pub fn add_computer(&mut self, computer: ComputeEndpoint) {
        self.computers.push(computer);
    }

    /// Queue a node for creation
    pub fn add_node(&mut self, node: NewNode) {
        self.nodes.push(node);
    }

    /// Queue a link for creation
    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Queue a group for creation
    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    /// Queue one node to join a group
    pub fn add_membership(&mut self, group: GroupUuid, node: NodeUuid) {
        self.memberships.push((group, node));
    }

    /// Builder: add a user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.add_user(user);
        self
    }

    /// Builder: add a compute endpoint
    #[inline]
    #[must_use]
    pub fn with_computer(mut self, computer: ComputeEndpoint) -> Self {
        self.add_computer(computer);
        self
    }

    /// Builder: add a node
    #[inline]
    #[must_use]
    pub fn with_node(mut self, node: NewNode) -> Self {
        self.add_node(node);
        self
    }

    /// Builder: add a link
    #[inline]
    #[must_use]
    pub fn with_link(mut self, link: Link) -> Self {
        self.add_link(link);
        self
    }

    /// Builder: add a group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: Group) -> Self {
        self.add_group(group);
        self
    }

    /// Builder: choose how links are checked
    #[inline]
    #[must_use]
    pub fn with_link_validation(mut self, validation: LinkValidation) -> Self {
        self.link_validation = validation;
        self
    }

    /// Add several members to one group
    #[must_use]
    pub fn with_members(mut self, group: GroupUuid, nodes: impl IntoIterator<Item = NodeUuid>) -> Self {
        self.memberships.extend(nodes.into_iter().map(|n| (group, n)));
        self
    }

    /// Total number of pending changes
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
            + self.computers.len()
            + self.nodes.len()
            + self.links.len()
            + self.groups.len()
            + self.memberships.len()
    }

    /// Whether nothing is queued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
