//! OpenStack API types.
//!
//! Request and response bodies for the compute, block-storage, and identity
//! endpoints used by the tag backends.

use serde::{Deserialize, Serialize};

use crate::planner::VolumeTag;

/// A compute instance as returned by the compute API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Server UUID.
    pub id: String,
    /// Server name.
    #[serde(default)]
    pub name: String,
}

/// A block-storage volume as returned by the volume API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume UUID.
    pub id: String,
    /// Volume name; unnamed volumes report `null`.
    #[serde(default)]
    pub name: Option<String>,
}

/// A resource that a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// Canonical resource ID.
    pub id: String,
    /// Resource name, when it has one.
    pub name: Option<String>,
}

impl From<Server> for ResolvedResource {
    fn from(server: Server) -> Self {
        Self {
            id: server.id,
            name: Some(server.name).filter(|n| !n.is_empty()),
        }
    }
}

impl From<Volume> for ResolvedResource {
    fn from(volume: Volume) -> Self {
        Self {
            id: volume.id,
            name: volume.name.filter(|n| !n.is_empty()),
        }
    }
}

/// `GET /servers/{id}` body.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerEnvelope {
    pub server: Server,
}

/// `GET /servers` body.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerList {
    pub servers: Vec<Server>,
}

/// `GET /volumes/{id}` body.
#[derive(Debug, Deserialize)]
pub(crate) struct VolumeEnvelope {
    pub volume: Volume,
}

/// `GET /volumes` body.
#[derive(Debug, Deserialize)]
pub(crate) struct VolumeList {
    pub volumes: Vec<Volume>,
}

/// Server tag list, used both for `GET` and `PUT /servers/{id}/tags`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ServerTagList {
    pub tags: Vec<String>,
}

/// `GET /os-vendor-volumes/{id}/tags` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeTagList {
    /// Tags currently on the volume.
    pub tags: Vec<VolumeTag>,
}

/// Action accepted by the vendor volume tag endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    /// Create or overwrite the given tags.
    Create,
    /// Delete the given tags.
    Delete,
}

/// `POST /os-vendor-volumes/{id}/tags/action` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeTagActionRequest {
    /// Action to perform.
    pub action: TagAction,
    /// Tags the action applies to.
    pub tags: Vec<VolumeTag>,
}

/// Keystone token response body (only the catalog is read).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

/// A service in the Keystone catalog.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// One endpoint of a catalog service.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub url: String,
}

impl CatalogEndpoint {
    /// Returns true if this endpoint serves `region`.
    pub(crate) fn in_region(&self, region: &str) -> bool {
        self.region_id.as_deref() == Some(region) || self.region.as_deref() == Some(region)
    }
}
