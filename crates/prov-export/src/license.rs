//! License filter
//!
//! Every node of an export closure is vetted against an allow-list and/or a
//! deny-list before anything is written. Each list is either a literal set of
//! license strings or a predicate. A predicate that returns an error counts as
//! a rejection.

use crate::graph::ProvenanceGraph;
use prov_model::{Node, NodeUuid};
use serde::de::Deserializer;
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by license predicates
pub type PredicateError = Box<dyn std::error::Error + Send + Sync>;

/// Predicate over a license string
pub type LicensePredicate = Arc<dyn Fn(&str) -> Result<bool, PredicateError> + Send + Sync>;

/// Which list of the policy rejected a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySide {
    Allowed,
    Forbidden,
}

impl fmt::Display for PolicySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed licenses"),
            Self::Forbidden => write!(f, "forbidden licenses"),
        }
    }
}

/// Export aborted because of a node's license
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LicensingError {
    /// Allow-list configured but the node declares no license
    #[error("node {node} has no license, which is not in the allowed licenses")]
    Missing { node: NodeUuid },

    /// License not accepted by the allow-list
    #[error("node {node} is licensed under '{license}', which is not in the allowed licenses")]
    NotAllowed { node: NodeUuid, license: String },

    /// License matched by the deny-list
    #[error("node {node} is licensed under '{license}', which is in the forbidden licenses")]
    Forbidden { node: NodeUuid, license: String },

    /// Predicate failed while evaluating the license
    #[error("checking license '{license}' of node {node} against {side} failed: {reason}")]
    PredicateFailed {
        node: NodeUuid,
        license: String,
        side: PolicySide,
        reason: String,
    },
}

impl LicensingError {
    /// Offending node
    #[must_use]
    pub fn node(&self) -> NodeUuid {
        match self {
            Self::Missing { node }
            | Self::NotAllowed { node, .. }
            | Self::Forbidden { node, .. }
            | Self::PredicateFailed { node, .. } => *node,
        }
    }

    /// Policy list that rejected the node
    #[must_use]
    pub fn side(&self) -> PolicySide {
        match self {
            Self::Missing { .. } | Self::NotAllowed { .. } => PolicySide::Allowed,
            Self::Forbidden { .. } => PolicySide::Forbidden,
            Self::PredicateFailed { side, .. } => *side,
        }
    }
}

/// One side of a license policy
#[derive(Clone)]
pub enum LicenseRule {
    /// Literal license strings
    List(BTreeSet<String>),
    /// Arbitrary predicate
    Predicate(LicensePredicate),
}

impl LicenseRule {
    /// Literal list rule
    #[must_use]
    pub fn list<I, S>(licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(licenses.into_iter().map(Into::into).collect())
    }

    /// Predicate rule
    #[must_use]
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Whether the rule matches `license`
    ///
    /// # Errors
    /// Returns the predicate's error rendered as text
    pub fn matches(&self, license: &str) -> Result<bool, String> {
        match self {
            Self::List(set) => Ok(set.contains(license)),
            Self::Predicate(predicate) => predicate(license).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Debug for LicenseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(set) => f.debug_tuple("List").field(set).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl Serialize for LicenseRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::List(set) => set.serialize(serializer),
            Self::Predicate(_) => Err(S::Error::custom("license predicates cannot be serialized")),
        }
    }
}

impl<'de> Deserialize<'de> for LicenseRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Self::list)
    }
}

/// Allow-list and/or deny-list applied to every exported node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LicensePolicy {
    /// Every node must pass this rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<LicenseRule>,
    /// No node may match this rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forbidden: Option<LicenseRule>,
}

impl LicensePolicy {
    /// Policy accepting everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept these licenses
    #[must_use]
    pub fn allow<I, S>(mut self, licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(LicenseRule::list(licenses));
        self
    }

    /// Only accept licenses the predicate approves
    #[must_use]
    pub fn allow_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.allowed = Some(LicenseRule::predicate(predicate));
        self
    }

    /// Reject these licenses
    #[must_use]
    pub fn forbid<I, S>(mut self, licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden = Some(LicenseRule::list(licenses));
        self
    }

    /// Reject licenses the predicate flags
    #[must_use]
    pub fn forbid_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.forbidden = Some(LicenseRule::predicate(predicate));
        self
    }

    /// Whether no rule is configured
    #[inline]
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_none() && self.forbidden.is_none()
    }

    /// Vet a single node
    ///
    /// # Errors
    /// Returns the first rule violation
    pub fn check_node(&self, node: &Node) -> Result<(), LicensingError> {
        let uuid = node.uuid();
        let license = node.license();

        if let Some(rule) = &self.allowed {
            let Some(license) = license else {
                return Err(LicensingError::Missing { node: uuid });
            };
            match rule.matches(license) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(LicensingError::NotAllowed {
                        node: uuid,
                        license: license.to_string(),
                    })
                }
                Err(reason) => {
                    return Err(LicensingError::PredicateFailed {
                        node: uuid,
                        license: license.to_string(),
                        side: PolicySide::Allowed,
                        reason,
                    })
                }
            }
        }

        if let (Some(rule), Some(license)) = (&self.forbidden, license) {
            match rule.matches(license) {
                Ok(false) => {}
                Ok(true) => {
                    return Err(LicensingError::Forbidden {
                        node: uuid,
                        license: license.to_string(),
                    })
                }
                Err(reason) => {
                    return Err(LicensingError::PredicateFailed {
                        node: uuid,
                        license: license.to_string(),
                        side: PolicySide::Forbidden,
                        reason,
                    })
                }
            }
        }
        Ok(())
    }

    /// Vet every node of a closure; stops at the first failure
    ///
    /// # Errors
    /// Returns the first rule violation in closure order
    pub fn check_graph(&self, graph: &ProvenanceGraph) -> Result<(), LicensingError> {
        if self.is_unrestricted() {
            return Ok(());
        }
        graph.nodes().try_for_each(|node| self.check_node(node))
    }
}
