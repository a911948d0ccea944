//! Provenance nodes
//!
//! A node goes through two states:
//!
//! - [`NewNode`]: transient, freely editable, not yet known to any store
//! - [`Node`]: stored; attributes are frozen, only extras can change
//!
//! Stores turn the former into the latter with [`Node::stored`].

use crate::error::ModelError;
use crate::ids::{ComputerUuid, NodeUuid};
use crate::value::{lookup, AttributeValue, Attributes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute path holding a node's declared license
pub const LICENSE_PATH: [&str; 2] = ["source", "license"];

/// Broad category of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Passive data
    Data,
    /// A single computation step
    Calculation,
    /// An orchestrating process that calls other processes
    Workflow,
}

impl NodeKind {
    /// Calculations and workflows are processes: they consume inputs and
    /// produce outputs
    #[inline]
    #[must_use]
    pub const fn is_process(self) -> bool {
        matches!(self, Self::Calculation | Self::Workflow)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Calculation => write!(f, "calculation"),
            Self::Workflow => write!(f, "workflow"),
        }
    }
}

/// Binary payload of a node: named files keyed by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    files: BTreeMap<String, Vec<u8>>,
}

impl Repository {
    /// Create empty repository
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidFilePath`] if the path is empty, absolute
    /// or contains `.`/`..` segments
    pub fn insert(&mut self, path: impl Into<String>, content: Vec<u8>) -> Result<(), ModelError> {
        let path = path.into();
        validate_relative_path(&path)?;
        self.files.insert(path, content);
        Ok(())
    }

    /// Builder-style [`Repository::insert`]
    ///
    /// # Errors
    /// Same as [`Repository::insert`]
    pub fn with_file(mut self, path: impl Into<String>, content: Vec<u8>) -> Result<Self, ModelError> {
        self.insert(path, content)?;
        Ok(self)
    }

    /// File content by path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Iterate files in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the repository holds no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Check that `path` is a normalized relative path with `/` separators
///
/// # Errors
/// Returns [`ModelError::InvalidFilePath`] on empty, absolute or
/// non-normalized paths
pub fn validate_relative_path(path: &str) -> Result<(), ModelError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(ModelError::InvalidFilePath(path.to_string()));
    }
    Ok(())
}

/// Transient node, editable until handed to a store
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    /// Identity, fixed at construction
    pub uuid: NodeUuid,
    /// Data or process
    pub kind: NodeKind,
    /// Dotted type name
    pub type_name: String,
    /// Free-form label
    pub label: String,
    /// Free-form description
    pub description: String,
    /// Attributes, frozen once stored
    pub attributes: Attributes,
    /// Extras, editable after storing
    pub extras: Attributes,
    /// Owner email
    pub user: Option<String>,
    /// Compute endpoint of a calculation
    pub computer: Option<ComputerUuid>,
    /// Creation time
    pub ctime: DateTime<Utc>,
    /// Last modification time
    pub mtime: DateTime<Utc>,
    /// Payload files
    pub repository: Repository,
}

impl NewNode {
    /// Fresh node of the given kind with a random UUID
    #[must_use]
    pub fn new(kind: NodeKind, type_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: NodeUuid::new(),
            kind,
            type_name: type_name.into(),
            label: String::new(),
            description: String::new(),
            attributes: Attributes::new(),
            extras: Attributes::new(),
            user: None,
            computer: None,
            ctime: now,
            mtime: now,
            repository: Repository::new(),
        }
    }

    /// Shortcut for a data node
    #[inline]
    #[must_use]
    pub fn data(type_name: impl Into<String>) -> Self {
        Self::new(NodeKind::Data, type_name)
    }

    /// Shortcut for a calculation node
    #[inline]
    #[must_use]
    pub fn calculation(type_name: impl Into<String>) -> Self {
        Self::new(NodeKind::Calculation, type_name)
    }

    /// Shortcut for a workflow node
    #[inline]
    #[must_use]
    pub fn workflow(type_name: impl Into<String>) -> Self {
        Self::new(NodeKind::Workflow, type_name)
    }

    /// With explicit UUID
    #[inline]
    #[must_use]
    pub fn with_uuid(mut self, uuid: NodeUuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// With label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With one attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// With one extra
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Declare a license under `source.license`
    #[must_use]
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        let mut source = match self.attributes.remove(LICENSE_PATH[0]) {
            Some(AttributeValue::Map(map)) => map,
            _ => BTreeMap::new(),
        };
        source.insert(LICENSE_PATH[1].to_string(), AttributeValue::String(license.into()));
        self.attributes
            .insert(LICENSE_PATH[0].to_string(), AttributeValue::Map(source));
        self
    }

    /// Owned by the user with this email
    #[inline]
    #[must_use]
    pub fn with_user(mut self, email: impl Into<String>) -> Self {
        self.user = Some(email.into());
        self
    }

    /// Bound to a compute endpoint
    #[inline]
    #[must_use]
    pub fn with_computer(mut self, computer: ComputerUuid) -> Self {
        self.computer = Some(computer);
        self
    }

    /// With payload repository
    #[inline]
    #[must_use]
    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repository = repository;
        self
    }
}

/// Stored node
///
/// # Invariants
/// - `uuid` never changes
/// - `attributes` are frozen; only `extras` can be replaced
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    uuid: NodeUuid,
    kind: NodeKind,
    type_name: String,
    label: String,
    description: String,
    attributes: Attributes,
    extras: Attributes,
    user: Option<String>,
    computer: Option<ComputerUuid>,
    ctime: DateTime<Utc>,
    mtime: DateTime<Utc>,
    repository: Repository,
}

impl Node {
    /// Freeze a transient node; called by stores when persisting it
    #[must_use]
    pub fn stored(new: NewNode) -> Self {
        Self {
            uuid: new.uuid,
            kind: new.kind,
            type_name: new.type_name,
            label: new.label,
            description: new.description,
            attributes: new.attributes,
            extras: new.extras,
            user: new.user,
            computer: new.computer,
            ctime: new.ctime,
            mtime: new.mtime,
            repository: new.repository,
        }
    }

    /// Replace extras and bump the modification time
    #[must_use]
    pub fn with_extras(mut self, extras: Attributes) -> Self {
        self.extras = extras;
        self.mtime = Utc::now();
        self
    }

    /// Global identity
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> NodeUuid {
        self.uuid
    }

    /// Data or process
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Dotted type name
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Free-form label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Free-form description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// All attributes
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Single attribute by key
    #[inline]
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// All extras
    #[inline]
    #[must_use]
    pub fn extras(&self) -> &Attributes {
        &self.extras
    }

    /// Owning user's email
    #[inline]
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Compute endpoint, for calculations
    #[inline]
    #[must_use]
    pub fn computer(&self) -> Option<ComputerUuid> {
        self.computer
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn ctime(&self) -> DateTime<Utc> {
        self.ctime
    }

    /// Last modification time
    #[inline]
    #[must_use]
    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    /// Payload files
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// License declared under `source.license`, if it is a string
    #[must_use]
    pub fn license(&self) -> Option<&str> {
        lookup(&self.attributes, &LICENSE_PATH).and_then(AttributeValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_is_read_from_source_mapping() {
        let node = Node::stored(
            NewNode::data("data.structure")
                .with_attribute("cell", 3_i64)
                .with_license("GPL"),
        );
        assert_eq!(node.license(), Some("GPL"));
        assert_eq!(node.attribute("cell"), Some(&AttributeValue::Integer(3)));
    }

    #[test]
    fn license_preserves_other_source_keys() {
        let mut source = BTreeMap::new();
        source.insert("db_name".to_string(), AttributeValue::from("icsd"));
        let node = NewNode::data("data.cif")
            .with_attribute("source", AttributeValue::Map(source))
            .with_license("CC0");
        let stored = Node::stored(node);
        assert_eq!(stored.license(), Some("CC0"));
        assert!(lookup(stored.attributes(), &["source", "db_name"]).is_some());
    }

    #[test]
    fn node_without_license() {
        let node = Node::stored(NewNode::calculation("calculation.job"));
        assert_eq!(node.license(), None);
        assert!(node.kind().is_process());
    }

    #[test]
    fn extras_can_change_after_store() {
        let node = Node::stored(NewNode::data("data.int").with_extra("tag", "a"));
        let mut extras = node.extras().clone();
        extras.insert("tag".to_string(), AttributeValue::from("b"));
        let node = node.with_extras(extras);
        assert_eq!(node.extras().get("tag").and_then(AttributeValue::as_str), Some("b"));
    }

    #[test]
    fn repository_rejects_escaping_paths() {
        let mut repo = Repository::new();
        assert!(repo.insert("path/in/repo.txt", b"ok".to_vec()).is_ok());
        for bad in ["", "/abs", "../up", "a/../b", "a//b", "./a", "a\\b"] {
            assert!(
                matches!(repo.insert(bad, vec![]), Err(ModelError::InvalidFilePath(_))),
                "accepted {bad:?}"
            );
        }
        assert_eq!(repo.len(), 1);
    }
}
