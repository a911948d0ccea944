//! Import plan and summary types
//!
//! The [`IdentityResolver`](crate::IdentityResolver) turns every archive
//! record into a [`Resolution`]: either a key of an entity the store already
//! holds, or the data of an entity to create. The
//! [`ImportMerger`](crate::ImportMerger) consumes the plan without further
//! lookups.

use prov_archive::NodeRecord;
use prov_model::{ComputeEndpoint, ComputerUuid, Group, GroupUuid, Link, NodeUuid, User};
use serde::Serialize;

/// Outcome of resolving one archive record against the store
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<K, R> {
    /// Already stored under this key; the archive copy is ignored
    Existing(K),
    /// To be created from the archive record
    New(R),
}

impl<K, R> Resolution<K, R> {
    /// Whether this entry will be created
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }

    /// Record to create, if any
    #[inline]
    pub fn into_new(self) -> Option<R> {
        match self {
            Self::Existing(_) => None,
            Self::New(record) => Some(record),
        }
    }
}

/// Computer imported under a new name because its name was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputerRename {
    /// Computer identity
    pub uuid: ComputerUuid,
    /// Name in the archive
    pub from: String,
    /// Name in the store
    pub to: String,
}

/// A group membership, `(group, node)`
pub type Membership = (GroupUuid, NodeUuid);

/// Resolution of every record in one archive
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    /// Users by email
    pub users: Vec<Resolution<String, User>>,
    /// Compute endpoints, already renamed where needed
    pub computers: Vec<Resolution<ComputerUuid, ComputeEndpoint>>,
    /// Nodes by UUID
    pub nodes: Vec<Resolution<NodeUuid, NodeRecord>>,
    /// Links
    pub links: Vec<Resolution<Link, Link>>,
    /// Groups by UUID
    pub groups: Vec<Resolution<GroupUuid, Group>>,
    /// Group memberships
    pub memberships: Vec<Resolution<Membership, Membership>>,
    /// Links skipped because an endpoint is unknown
    pub dropped_links: Vec<Link>,
    /// Memberships skipped because the member is unknown
    pub dropped_memberships: Vec<Membership>,
    /// Computers that got a new name
    pub renamed_computers: Vec<ComputerRename>,
}

impl ImportPlan {
    /// Whether applying the plan would change the store
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !(self.users.iter().any(Resolution::is_new)
            || self.computers.iter().any(Resolution::is_new)
            || self.nodes.iter().any(Resolution::is_new)
            || self.links.iter().any(Resolution::is_new)
            || self.groups.iter().any(Resolution::is_new)
            || self.memberships.iter().any(Resolution::is_new))
    }

    /// Counts the import will report once the plan is applied
    #[must_use]
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            users: Tally::of(&self.users),
            computers: Tally::of(&self.computers),
            nodes: Tally::of(&self.nodes),
            links: Tally::of(&self.links),
            groups: Tally::of(&self.groups),
            memberships: Tally::of(&self.memberships),
            dropped_links: self.dropped_links.len(),
            dropped_memberships: self.dropped_memberships.len(),
            renamed_computers: self.renamed_computers.clone(),
        }
    }
}

/// Created versus already-present entities of one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Entities created by the import
    pub created: usize,
    /// Entities the store already had
    pub existing: usize,
}

impl Tally {
    fn of<K, R>(items: &[Resolution<K, R>]) -> Self {
        let created = items.iter().filter(|r| r.is_new()).count();
        Self {
            created,
            existing: items.len() - created,
        }
    }
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Users
    pub users: Tally,
    /// Compute endpoints
    pub computers: Tally,
    /// Nodes
    pub nodes: Tally,
    /// Links
    pub links: Tally,
    /// Groups
    pub groups: Tally,
    /// Group memberships
    pub memberships: Tally,
    /// Links skipped because an endpoint is unknown
    pub dropped_links: usize,
    /// Memberships skipped because the member is unknown
    pub dropped_memberships: usize,
    /// Computers that got a new name
    pub renamed_computers: Vec<ComputerRename>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_splits_created_and_existing() {
        let items: Vec<Resolution<u8, &str>> = vec![
            Resolution::Existing(1),
            Resolution::New("a"),
            Resolution::New("b"),
        ];
        assert_eq!(Tally::of(&items), Tally { created: 2, existing: 1 });
    }

    #[test]
    fn empty_plan_is_noop() {
        let mut plan = ImportPlan::default();
        assert!(plan.is_noop());
        plan.users.push(Resolution::Existing("a@b.c".into()));
        assert!(plan.is_noop());
        plan.users.push(Resolution::New(User::new("d@e.f")));
        assert!(!plan.is_noop());
        assert_eq!(plan.summary().users, Tally { created: 1, existing: 1 });
    }
}
