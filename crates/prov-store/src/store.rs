//! Store capability interface

use crate::changes::ChangeSet;
use crate::error::{StoreError, StoreResult};
use crate::query::{EndpointKey, LinkDirection, NodeFilter};
use prov_model::{
    Attributes, ComputeEndpoint, Group, GroupUuid, Link, LinkKind, NewNode, Node, NodeUuid, User,
};

/// Capabilities the export/import engine needs from a graph store
///
/// Lookups return `Ok(None)` for missing entities; `Err` is reserved for
/// backend failures and rule violations. All creation funnels through
/// [`Store::commit`], which is atomic.
pub trait Store: Send + Sync {
    /// Node by UUID
    ///
    /// # Errors
    /// Backend failures only
    fn get_node(&self, uuid: NodeUuid) -> StoreResult<Option<Node>>;

    /// Nodes matching a filter, in insertion order
    ///
    /// # Errors
    /// Backend failures only
    fn query_nodes(&self, filter: &NodeFilter) -> StoreResult<Vec<Node>>;

    /// Links touching `node` in `direction`, restricted to `kinds`
    /// (empty = all kinds)
    ///
    /// # Errors
    /// Backend failures only
    fn get_links(
        &self,
        node: NodeUuid,
        direction: LinkDirection,
        kinds: &[LinkKind],
    ) -> StoreResult<Vec<Link>>;

    /// User by email
    ///
    /// # Errors
    /// Backend failures only
    fn get_user(&self, email: &str) -> StoreResult<Option<User>>;

    /// Compute endpoint by UUID or name
    ///
    /// # Errors
    /// Backend failures only
    fn get_compute_endpoint(&self, key: EndpointKey<'_>) -> StoreResult<Option<ComputeEndpoint>>;

    /// All compute endpoints
    ///
    /// # Errors
    /// Backend failures only
    fn list_compute_endpoints(&self) -> StoreResult<Vec<ComputeEndpoint>>;

    /// Group by UUID
    ///
    /// # Errors
    /// Backend failures only
    fn get_group(&self, uuid: GroupUuid) -> StoreResult<Option<Group>>;

    /// Member nodes of a group
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the group does not exist
    fn group_members(&self, group: GroupUuid) -> StoreResult<Vec<NodeUuid>>;

    /// Replace the extras of a stored node
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the node does not exist
    fn update_extras(&self, uuid: NodeUuid, extras: Attributes) -> StoreResult<Node>;

    /// Apply a change set atomically
    ///
    /// # Errors
    /// Any rule violation aborts the whole commit; nothing becomes visible
    fn commit(&self, changes: ChangeSet) -> StoreResult<()>;

    /// Node by UUID, failing when it is missing
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the node does not exist
    fn node(&self, uuid: NodeUuid) -> StoreResult<Node> {
        self.get_node(uuid)?
            .ok_or_else(|| StoreError::node_not_found(uuid))
    }

    /// Create one node
    ///
    /// # Errors
    /// Same as [`Store::commit`]
    fn create_node(&self, node: NewNode) -> StoreResult<Node> {
        let uuid = node.uuid;
        self.commit(ChangeSet::new().with_node(node))?;
        self.node(uuid)
    }

    /// Create one link
    ///
    /// # Errors
    /// Same as [`Store::commit`]
    fn create_link(&self, link: Link) -> StoreResult<()> {
        self.commit(ChangeSet::new().with_link(link))
    }

    /// Create one user
    ///
    /// # Errors
    /// Same as [`Store::commit`]
    fn create_user(&self, user: User) -> StoreResult<()> {
        self.commit(ChangeSet::new().with_user(user))
    }

    /// Create one compute endpoint
    ///
    /// # Errors
    /// Same as [`Store::commit`]
    fn create_compute_endpoint(&self, computer: ComputeEndpoint) -> StoreResult<()> {
        self.commit(ChangeSet::new().with_computer(computer))
    }

    /// Create one group
    ///
    /// # Errors
    /// Same as [`Store::commit`]
    fn create_group(&self, group: Group) -> StoreResult<()> {
        self.commit(ChangeSet::new().with_group(group))
    }

    /// Add nodes to a group; existing memberships are left alone
    ///
    /// # Errors
    /// Same as [`Store::commit`]
    fn add_group_members(&self, group: GroupUuid, nodes: &[NodeUuid]) -> StoreResult<()> {
        self.commit(ChangeSet::new().with_members(group, nodes.iter().copied()))
    }
}
