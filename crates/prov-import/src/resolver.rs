//! Identity resolution
//!
//! Archive records are joined to store entities through global keys only:
//! node, group and computer UUIDs and user emails. Rules:
//!
//! - a stored node or group wins over its archive copy;
//! - users are matched by email; owners missing from both archive and store
//!   get a minimal user record, unowned records go to the default user;
//! - a computer with an unknown UUID but a taken name is created under
//!   `<name>_<n>`, with `n` the smallest free suffix starting at 0;
//! - links and memberships touching a node that is in neither the archive
//!   nor the store fail the import, or are dropped when allowed.

use crate::error::{ImportError, ImportResult};
use crate::options::ImportContext;
use crate::plan::{ComputerRename, ImportPlan, Resolution};
use indexmap::{IndexMap, IndexSet};
use prov_archive::{ArchiveData, GroupRecord};
use prov_model::{ComputeEndpoint, GroupUuid, Link, NodeUuid, User};
use prov_store::{EndpointKey, LinkDirection, Store};
use std::collections::HashSet;

/// Builds an [`ImportPlan`] by matching archive records against a store
///
/// Resolution only reads from the store.
pub struct IdentityResolver<'s, S: Store + ?Sized> {
    store: &'s S,
    context: &'s ImportContext,
    ignore_unknown_nodes: bool,
}

impl<'s, S: Store + ?Sized> IdentityResolver<'s, S> {
    /// Resolver reading existing entities from `store`
    #[must_use]
    pub fn new(store: &'s S, context: &'s ImportContext) -> Self {
        Self {
            store,
            context,
            ignore_unknown_nodes: false,
        }
    }

    /// Drop links and memberships with unknown nodes instead of failing
    #[inline]
    #[must_use]
    pub fn with_ignore_unknown_nodes(mut self, ignore: bool) -> Self {
        self.ignore_unknown_nodes = ignore;
        self
    }

    /// Resolve every record of `data`
    ///
    /// # Errors
    /// - [`ImportError::UnknownNode`] for a link or membership pointing
    ///   outside archive and store, unless unknown nodes are ignored
    /// - store read failures
    pub fn resolve(&self, data: ArchiveData) -> ImportResult<ImportPlan> {
        let mut plan = ImportPlan::default();
        let archive_nodes: HashSet<NodeUuid> = data.nodes.iter().map(|n| n.uuid).collect();
        let mut owners: IndexSet<String> = IndexSet::new();

        self.resolve_computers(data.computers, &mut plan)?;

        let mut created_nodes = HashSet::new();
        for mut record in data.nodes {
            if self.store.get_node(record.uuid)?.is_some() {
                tracing::debug!("Node {} already stored", record.uuid);
                plan.nodes.push(Resolution::Existing(record.uuid));
                continue;
            }
            let owner = record
                .user
                .get_or_insert_with(|| self.context.default_user.clone());
            owners.insert(owner.clone());
            created_nodes.insert(record.uuid);
            plan.nodes.push(Resolution::New(record));
        }

        let mut existing_groups = HashSet::new();
        let mut group_records = Vec::with_capacity(data.groups.len());
        for GroupRecord { mut group, members } in data.groups {
            if self.store.get_group(group.uuid)?.is_some() {
                tracing::debug!("Group {} already stored", group.uuid);
                existing_groups.insert(group.uuid);
                plan.groups.push(Resolution::Existing(group.uuid));
            } else {
                let owner = group
                    .user
                    .get_or_insert_with(|| self.context.default_user.clone());
                owners.insert(owner.clone());
                plan.groups.push(Resolution::New(group.clone()));
            }
            group_records.push((group, members));
        }

        self.resolve_users(data.users, owners, &mut plan)?;
        self.resolve_links(data.links, &archive_nodes, &created_nodes, &mut plan)?;
        for (group, members) in group_records {
            let existing = existing_groups.contains(&group.uuid);
            self.resolve_members(&group.name, group.uuid, existing, members, &archive_nodes, &mut plan)?;
        }
        Ok(plan)
    }

    fn resolve_computers(&self, computers: Vec<ComputeEndpoint>, plan: &mut ImportPlan) -> ImportResult<()> {
        let mut planned_names = HashSet::new();
        for mut computer in computers {
            if self
                .store
                .get_compute_endpoint(EndpointKey::Uuid(computer.uuid))?
                .is_some()
            {
                tracing::debug!("Computer {} ({}) already stored", computer.name, computer.uuid);
                plan.computers.push(Resolution::Existing(computer.uuid));
                continue;
            }
            let name = self.free_computer_name(&computer.name, &planned_names)?;
            if name != computer.name {
                tracing::warn!(
                    "Computer name '{}' is taken; importing {} as '{}'",
                    computer.name,
                    computer.uuid,
                    name
                );
                plan.renamed_computers.push(ComputerRename {
                    uuid: computer.uuid,
                    from: std::mem::replace(&mut computer.name, name.clone()),
                    to: name.clone(),
                });
            }
            planned_names.insert(name);
            plan.computers.push(Resolution::New(computer));
        }
        Ok(())
    }

    /// `base`, or the first of `base_0`, `base_1`, ... not used by the store
    /// or by computers already planned
    fn free_computer_name(&self, base: &str, planned: &HashSet<String>) -> ImportResult<String> {
        let taken = |name: &str| -> ImportResult<bool> {
            Ok(planned.contains(name)
                || self
                    .store
                    .get_compute_endpoint(EndpointKey::Name(name))?
                    .is_some())
        };
        if !taken(base)? {
            return Ok(base.to_string());
        }
        let mut suffix = 0_u64;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !taken(&candidate)? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }

    fn resolve_users(
        &self,
        users: Vec<User>,
        owners: IndexSet<String>,
        plan: &mut ImportPlan,
    ) -> ImportResult<()> {
        let mut resolved: IndexMap<String, Resolution<String, User>> = IndexMap::new();
        let minimal = owners.into_iter().map(User::new);
        for user in users.into_iter().chain(minimal) {
            if resolved.contains_key(&user.email) {
                continue;
            }
            let resolution = if self.store.get_user(&user.email)?.is_some() {
                Resolution::Existing(user.email.clone())
            } else {
                tracing::debug!("Creating user {}", user.email);
                Resolution::New(user.clone())
            };
            resolved.insert(user.email, resolution);
        }
        plan.users = resolved.into_values().collect();
        Ok(())
    }

    fn resolve_links(
        &self,
        links: Vec<Link>,
        archive_nodes: &HashSet<NodeUuid>,
        created_nodes: &HashSet<NodeUuid>,
        plan: &mut ImportPlan,
    ) -> ImportResult<()> {
        let mut seen = HashSet::new();
        for link in links {
            if !seen.insert(link.clone()) {
                continue;
            }
            if let Some(missing) = self.first_unknown(archive_nodes, [link.source, link.target])? {
                if !self.ignore_unknown_nodes {
                    return Err(ImportError::UnknownNode {
                        uuid: missing,
                        referenced_by: format!("{} link '{}'", link.kind, link.label),
                    });
                }
                tracing::warn!(
                    "Dropping {} link '{}': node {} is unknown",
                    link.kind,
                    link.label,
                    missing
                );
                plan.dropped_links.push(link);
                continue;
            }

            let touches_new = created_nodes.contains(&link.source) || created_nodes.contains(&link.target);
            let stored = !touches_new
                && self
                    .store
                    .get_links(link.target, LinkDirection::Incoming, &[link.kind])?
                    .iter()
                    .any(|l| l.source == link.source && l.label == link.label);
            plan.links.push(if stored {
                Resolution::Existing(link)
            } else {
                Resolution::New(link)
            });
        }
        Ok(())
    }

    fn resolve_members(
        &self,
        name: &str,
        group: GroupUuid,
        group_exists: bool,
        members: Vec<NodeUuid>,
        archive_nodes: &HashSet<NodeUuid>,
        plan: &mut ImportPlan,
    ) -> ImportResult<()> {
        let stored: HashSet<NodeUuid> = if group_exists {
            self.store.group_members(group)?.into_iter().collect()
        } else {
            HashSet::new()
        };
        let members: IndexSet<NodeUuid> = members.into_iter().collect();
        for node in members {
            if let Some(missing) = self.first_unknown(archive_nodes, [node])? {
                if !self.ignore_unknown_nodes {
                    return Err(ImportError::UnknownNode {
                        uuid: missing,
                        referenced_by: format!("group '{name}'"),
                    });
                }
                tracing::warn!("Dropping member {} of group '{}': node is unknown", missing, name);
                plan.dropped_memberships.push((group, node));
                continue;
            }
            plan.memberships.push(if stored.contains(&node) {
                Resolution::Existing((group, node))
            } else {
                Resolution::New((group, node))
            });
        }
        Ok(())
    }

    /// First node of `uuids` found in neither the archive nor the store
    fn first_unknown(
        &self,
        archive_nodes: &HashSet<NodeUuid>,
        uuids: impl IntoIterator<Item = NodeUuid>,
    ) -> ImportResult<Option<NodeUuid>> {
        for uuid in uuids {
            if !archive_nodes.contains(&uuid) && self.store.get_node(uuid)?.is_none() {
                return Ok(Some(uuid));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_archive::NodeRecord;
    use prov_model::{LinkKind, NewNode, Node};
    use prov_store::{ChangeSet, InMemoryStore};

    fn record(node: NewNode) -> NodeRecord {
        NodeRecord::from_node(&Node::stored(node))
    }

    fn context() -> ImportContext {
        ImportContext::new("importer@prov.test")
    }

    #[test]
    fn new_and_existing_nodes() {
        let store = InMemoryStore::new();
        let stored = store.create_node(NewNode::data("data.int")).unwrap();
        let fresh = record(NewNode::data("data.int"));
        let data = ArchiveData {
            nodes: vec![NodeRecord::from_node(&stored), fresh.clone()],
            links: vec![Link::new(stored.uuid(), fresh.uuid, "copy", LinkKind::Input)],
            ..ArchiveData::default()
        };

        let ctx = context();
        let plan = IdentityResolver::new(&store, &ctx).resolve(data).unwrap();
        assert_eq!(plan.nodes[0], Resolution::Existing(stored.uuid()));
        match &plan.nodes[1] {
            Resolution::New(r) => assert_eq!(r.user.as_deref(), Some("importer@prov.test")),
            other => panic!("expected a new node, got {other:?}"),
        }
        assert!(plan.links[0].is_new());
        // the default user is created for the unowned node
        assert_eq!(plan.users, vec![Resolution::New(User::new("importer@prov.test"))]);
    }

    #[test]
    fn computer_renames_skip_taken_suffixes() {
        let store = InMemoryStore::new();
        store
            .commit(
                ChangeSet::new()
                    .with_computer(ComputeEndpoint::new("cluster", "a"))
                    .with_computer(ComputeEndpoint::new("cluster_0", "b")),
            )
            .unwrap();
        let incoming = ComputeEndpoint::new("cluster", "c");
        let data = ArchiveData {
            computers: vec![incoming.clone()],
            ..ArchiveData::default()
        };

        let ctx = context();
        let plan = IdentityResolver::new(&store, &ctx).resolve(data).unwrap();
        assert_eq!(
            plan.renamed_computers,
            vec![ComputerRename {
                uuid: incoming.uuid,
                from: "cluster".into(),
                to: "cluster_1".into(),
            }]
        );
        match &plan.computers[0] {
            Resolution::New(c) => assert_eq!(c.name, "cluster_1"),
            other => panic!("expected a new computer, got {other:?}"),
        }
    }

    #[test]
    fn known_computer_uuid_is_not_renamed() {
        let store = InMemoryStore::new();
        let computer = ComputeEndpoint::new("cluster", "a");
        store.create_compute_endpoint(computer.clone()).unwrap();
        let mut copy = computer.clone();
        copy.hostname = "elsewhere".into();
        let data = ArchiveData {
            computers: vec![copy],
            ..ArchiveData::default()
        };

        let ctx = context();
        let plan = IdentityResolver::new(&store, &ctx).resolve(data).unwrap();
        assert_eq!(plan.computers, vec![Resolution::Existing(computer.uuid)]);
        assert!(plan.renamed_computers.is_empty());
    }

    #[test]
    fn unknown_link_endpoint() {
        let store = InMemoryStore::new();
        let calc = record(NewNode::calculation("calculation.job"));
        let ghost = NodeUuid::new();
        let data = ArchiveData {
            nodes: vec![calc.clone()],
            links: vec![Link::new(ghost, calc.uuid, "ghost", LinkKind::Input)],
            ..ArchiveData::default()
        };

        let ctx = context();
        let err = IdentityResolver::new(&store, &ctx)
            .resolve(data.clone())
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownNode { uuid, .. } if uuid == ghost));

        let plan = IdentityResolver::new(&store, &ctx)
            .with_ignore_unknown_nodes(true)
            .resolve(data)
            .unwrap();
        assert!(plan.links.is_empty());
        assert_eq!(plan.dropped_links.len(), 1);
    }

    #[test]
    fn owners_missing_everywhere_get_minimal_users() {
        let store = InMemoryStore::new();
        store.create_user(User::new("known@prov.test")).unwrap();
        let a = record(NewNode::data("data.int").with_user("known@prov.test"));
        let b = record(NewNode::data("data.int").with_user("stranger@prov.test"));
        let data = ArchiveData {
            nodes: vec![a, b],
            users: vec![User::new("known@prov.test").with_institution("Elsewhere")],
            ..ArchiveData::default()
        };

        let ctx = context();
        let plan = IdentityResolver::new(&store, &ctx).resolve(data).unwrap();
        assert_eq!(
            plan.users,
            vec![
                Resolution::Existing("known@prov.test".to_string()),
                Resolution::New(User::new("stranger@prov.test")),
            ]
        );
    }
}
