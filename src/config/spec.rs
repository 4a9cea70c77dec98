//! Configuration specification types.
//!
//! This module defines the structs that map to `clouds.yaml` and to tag task
//! files. Task files use the same keys as the module parameters, so a task
//! reads like:
//!
//! ```yaml
//! server: web-01
//! state: present
//! tags:
//!   - env.prod
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::planner::{DesiredState, ServerTags, VolumeTags};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root of a `clouds.yaml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudsFile {
    /// Named cloud definitions.
    #[serde(default)]
    pub clouds: HashMap<String, CloudConfig>,
}

/// Connection settings for one cloud.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudConfig {
    /// Identity credentials.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Region used to pick catalog endpoints.
    #[serde(default)]
    pub region_name: Option<String>,
    /// Endpoint interface (`public`, `internal`, `admin`).
    #[serde(default)]
    pub interface: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Compute endpoint used instead of the catalog entry.
    #[serde(default)]
    pub compute_endpoint_override: Option<String>,
    /// Block-storage endpoint used instead of the catalog entry.
    #[serde(default)]
    pub block_storage_endpoint_override: Option<String>,
}

/// Keystone v3 password credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    /// Identity endpoint, e.g. `https://keystone.example.com:5000/v3`.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// User name.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Project name to scope the token to.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Project ID to scope the token to; wins over `project_name`.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Domain of the user.
    #[serde(default)]
    pub user_domain_name: Option<String>,
    /// Domain of the project.
    #[serde(default)]
    pub project_domain_name: Option<String>,
}

impl CloudConfig {
    /// Interface to select from the catalog.
    #[must_use]
    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("public")
    }

    /// Request timeout in seconds.
    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

impl AuthConfig {
    /// User domain, defaulting to `Default`.
    #[must_use]
    pub fn user_domain(&self) -> &str {
        self.user_domain_name.as_deref().unwrap_or("Default")
    }

    /// Project domain, defaulting to `Default`.
    #[must_use]
    pub fn project_domain(&self) -> &str {
        self.project_domain_name.as_deref().unwrap_or("Default")
    }
}

/// One tag invocation read from a task file.
///
/// The `server` or `volume` key selects the kind of task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TagTask {
    /// Tags on a compute instance.
    Server(ServerTagTask),
    /// Tags on a block-storage volume.
    Volume(VolumeTagTask),
}

/// Parameters of a server tag invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerTagTask {
    /// Name or ID of the server.
    pub server: String,
    /// Desired state of the tags.
    #[serde(default)]
    pub state: DesiredState,
    /// Tags to set or remove.
    #[serde(default)]
    pub tags: ServerTags,
    /// Ignored. Accepted for backwards compatibility.
    #[serde(default)]
    pub availability_zone: Option<String>,
}

/// Parameters of a volume tag invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VolumeTagTask {
    /// Name or ID of the volume.
    pub volume: String,
    /// Desired state of the tags.
    #[serde(default)]
    pub state: DesiredState,
    /// Key/value tags to set or remove.
    #[serde(default)]
    pub tags: VolumeTags,
    /// Ignored. Accepted for backwards compatibility.
    #[serde(default)]
    pub availability_zone: Option<String>,
}

impl<'de> Deserialize<'de> for TagTask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;

        if value.get("server").is_some() {
            serde_yaml::from_value(value)
                .map(Self::Server)
                .map_err(|e| D::Error::custom(format!("invalid server task: {e}")))
        } else if value.get("volume").is_some() {
            serde_yaml::from_value(value)
                .map(Self::Volume)
                .map_err(|e| D::Error::custom(format!("invalid volume task: {e}")))
        } else {
            Err(D::Error::custom("task must set either `server` or `volume`"))
        }
    }
}

impl TagTask {
    /// The resource reference this task targets.
    #[must_use]
    pub fn reference(&self) -> &str {
        match self {
            Self::Server(task) => &task.server,
            Self::Volume(task) => &task.volume,
        }
    }
}
