//! PROV Store Interface
//!
//! The capability surface the export/import engine consumes from a graph
//! store, plus an in-memory implementation.
//!
//! # Overview
//!
//! - **Store**: lookups by UUID/email/name, link queries by direction and kind
//! - **ChangeSet**: batched creations, committed all-or-nothing
//! - **InMemoryStore**: reference implementation enforcing link legality,
//!   `(target, label)` uniqueness and referential integrity
//!
//! # Example
//!
//! ```rust
//! use prov_model::{Link, LinkKind, NewNode};
//! use prov_store::{ChangeSet, InMemoryStore, LinkDirection, Store};
//!
//! let store = InMemoryStore::new();
//! let data = NewNode::data("data.int");
//! let calc = NewNode::calculation("calculation.job");
//! let (d, c) = (data.uuid, calc.uuid);
//!
//! store
//!     .commit(
//!         ChangeSet::new()
//!             .with_node(data)
//!             .with_node(calc)
//!             .with_link(Link::new(d, c, "x", LinkKind::Input)),
//!     )
//!     .unwrap();
//!
//! let inputs = store.get_links(c, LinkDirection::Incoming, &[LinkKind::Input]).unwrap();
//! assert_eq!(inputs.len(), 1);
//! ```

pub mod changes;
pub mod error;
pub mod memory;
pub mod query;
pub mod store;

pub use changes::{ChangeSet, LinkValidation};
pub use error::{EntityKind, StoreError, StoreResult};
pub use memory::{InMemoryStore, StoreCounts};
pub use query::{kind_allowed, EndpointKey, LinkDirection, NodeFilter};
pub use store::Store;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
