//! PROV Data Model
//!
//! Entities of a directed provenance graph.
//!
//! # Core Concepts
//!
//! - [`Node`]: data or process entity, addressed by a global [`NodeUuid`]
//! - [`Link`]: directed, labelled edge of a [`LinkKind`]
//! - [`User`], [`ComputeEndpoint`], [`Group`]: shared infrastructure records
//! - [`AttributeValue`]: typed attribute/extra values with exact JSON form
//! - [`ContentHash`]: Blake3 digest for payload files
//!
//! # Example
//!
//! ```rust,ignore
//! use prov_model::{Link, LinkKind, NewNode, Node};
//!
//! let input = Node::stored(NewNode::data("data.int").with_attribute("value", 1_i64));
//! let calc = Node::stored(NewNode::calculation("calculation.job"));
//! let link = Link::new(input.uuid(), calc.uuid(), "x", LinkKind::Input);
//! LinkKind::Input.check_endpoints(input.kind(), calc.kind())?;
//! ```

mod entity;
mod error;
mod hash;
mod ids;
mod link;
mod node;
mod value;

pub use entity::{ComputeEndpoint, Group, JsonObject, User};
pub use error::ModelError;
pub use hash::{ContentHash, HashError};
pub use ids::{ComputerUuid, GroupUuid, NodeUuid};
pub use link::{Link, LinkKind};
pub use node::{validate_relative_path, NewNode, Node, NodeKind, Repository, LICENSE_PATH};
pub use value::{lookup, AttributeValue, Attributes, Timestamp};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
