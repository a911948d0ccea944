//! Users, compute endpoints and groups

use crate::ids::{ComputerUuid, GroupUuid};
use serde::{Deserialize, Serialize};

/// JSON object used for endpoint metadata and transport parameters
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A user, identified by email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique email address
    pub email: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Affiliation
    #[serde(default)]
    pub institution: String,
}

impl User {
    /// User with only an email
    #[inline]
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            institution: String::new(),
        }
    }

    /// With full name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// With institution
    #[inline]
    #[must_use]
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = institution.into();
        self
    }
}

/// External compute resource descriptor ("computer")
///
/// The UUID is global; the name is only unique inside one store, which is why
/// imports may have to rename incoming endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeEndpoint {
    /// Global identity
    pub uuid: ComputerUuid,
    /// Store-local unique name
    pub name: String,
    /// Host to connect to
    pub hostname: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Transport plugin, e.g. `ssh`
    pub transport_type: String,
    /// Scheduler plugin, e.g. `slurm`
    pub scheduler_type: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: JsonObject,
    /// Transport configuration
    #[serde(default)]
    pub transport_params: JsonObject,
}

impl ComputeEndpoint {
    /// Endpoint with a random UUID and local transport/direct scheduler
    #[must_use]
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            uuid: ComputerUuid::new(),
            name: name.into(),
            hostname: hostname.into(),
            description: String::new(),
            transport_type: "local".to_string(),
            scheduler_type: "direct".to_string(),
            metadata: JsonObject::new(),
            transport_params: JsonObject::new(),
        }
    }

    /// With explicit UUID
    #[inline]
    #[must_use]
    pub fn with_uuid(mut self, uuid: ComputerUuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// With transport and scheduler plugin names
    #[inline]
    #[must_use]
    pub fn with_plugins(mut self, transport: impl Into<String>, scheduler: impl Into<String>) -> Self {
        self.transport_type = transport.into();
        self.scheduler_type = scheduler.into();
        self
    }

    /// With metadata blob
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonObject) -> Self {
        self.metadata = metadata;
        self
    }

    /// With transport parameters blob
    #[inline]
    #[must_use]
    pub fn with_transport_params(mut self, params: JsonObject) -> Self {
        self.transport_params = params;
        self
    }
}

/// Named collection of nodes; the name is not unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Global identity
    pub uuid: GroupUuid,
    /// Display name
    pub name: String,
    /// Group type, e.g. `core`
    #[serde(default)]
    pub type_string: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Owner email
    #[serde(default)]
    pub user: Option<String>,
}

impl Group {
    /// Group with a random UUID
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: GroupUuid::new(),
            name: name.into(),
            type_string: String::new(),
            description: String::new(),
            user: None,
        }
    }

    /// With explicit UUID
    #[inline]
    #[must_use]
    pub fn with_uuid(mut self, uuid: GroupUuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// Owned by the user with this email
    #[inline]
    #[must_use]
    pub fn with_user(mut self, email: impl Into<String>) -> Self {
        self.user = Some(email.into());
        self
    }
}
