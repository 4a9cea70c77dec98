//! In-memory cloud used by tests.
//!
//! Keeps server and volume tags in memory, serves the vendor volume tag
//! paths, and records every mutating call so tests can assert on them.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::error::{ProviderError, Result};

use super::api::CloudApi;
use super::types::{Server, TagAction, Volume, VolumeTagActionRequest};

#[derive(Debug, Default)]
struct Inventory {
    servers: Vec<(Server, BTreeSet<String>)>,
    volumes: Vec<(Volume, BTreeMap<String, String>)>,
    calls: Vec<String>,
    failing_call: Option<String>,
}

/// In-memory [`CloudApi`] implementation.
#[derive(Debug, Default)]
pub struct FakeCloud {
    inventory: Mutex<Inventory>,
}

impl FakeCloud {
    /// Creates an empty cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a server with the given tags.
    pub fn with_server(self, id: &str, name: &str, tags: &[&str]) -> Self {
        self.lock().servers.push((
            Server {
                id: id.to_string(),
                name: name.to_string(),
            },
            tags.iter().map(|t| (*t).to_string()).collect(),
        ));
        self
    }

    /// Adds a volume with the given tags.
    pub fn with_volume(self, id: &str, name: &str, tags: &[(&str, &str)]) -> Self {
        self.lock().volumes.push((
            Volume {
                id: id.to_string(),
                name: Some(name.to_string()),
            },
            tags.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        self
    }

    /// Makes the mutating call logged as `call` fail with a 409.
    pub fn fail_on(self, call: &str) -> Self {
        self.lock().failing_call = Some(call.to_string());
        self
    }

    /// Mutating calls issued so far, e.g. `remove_server_tag srv-1 a`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn not_found(what: &str) -> ProviderError {
    ProviderError::api_error(
        404,
        format!("{what} could not be found."),
        Some(serde_json::json!({ "itemNotFound": { "code": 404 } })),
    )
}

/// Extracts the volume ID from a vendor tag path.
fn vendor_volume_id(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/os-vendor-volumes/")?;
    let (id, tail) = rest.split_once('/')?;
    matches!(tail, "tags" | "tags/action").then_some(id)
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn find_server(&self, reference: &str) -> Result<Option<Server>> {
        Ok(self
            .lock()
            .servers
            .iter()
            .find(|(s, _)| s.id == reference || s.name == reference)
            .map(|(s, _)| s.clone()))
    }

    async fn server_tags(&self, server_id: &str) -> Result<Vec<String>> {
        let inventory = self.lock();
        let (_, tags) = inventory
            .servers
            .iter()
            .find(|(s, _)| s.id == server_id)
            .ok_or_else(|| not_found("Instance"))?;
        Ok(tags.iter().cloned().collect())
    }

    async fn set_server_tags(&self, server_id: &str, tags: &[String]) -> Result<()> {
        let mut inventory = self.lock();
        inventory
            .calls
            .push(format!("set_server_tags {server_id} {}", tags.join(",")));
        let (_, current) = inventory
            .servers
            .iter_mut()
            .find(|(s, _)| s.id == server_id)
            .ok_or_else(|| not_found("Instance"))?;
        *current = tags.iter().cloned().collect();
        Ok(())
    }

    async fn remove_server_tag(&self, server_id: &str, tag: &str) -> Result<()> {
        let mut inventory = self.lock();
        inventory
            .calls
            .push(format!("remove_server_tag {server_id} {tag}"));
        let (_, current) = inventory
            .servers
            .iter_mut()
            .find(|(s, _)| s.id == server_id)
            .ok_or_else(|| not_found("Instance"))?;
        if current.remove(tag) {
            Ok(())
        } else {
            Err(not_found("Tag").into())
        }
    }

    async fn find_volume(&self, reference: &str) -> Result<Option<Volume>> {
        Ok(self
            .lock()
            .volumes
            .iter()
            .find(|(v, _)| v.id == reference || v.name.as_deref() == Some(reference))
            .map(|(v, _)| v.clone()))
    }

    async fn block_storage_get(&self, path: &str) -> Result<serde_json::Value> {
        let id = vendor_volume_id(path).ok_or_else(|| not_found(path))?;
        let inventory = self.lock();
        let (_, tags) = inventory
            .volumes
            .iter()
            .find(|(v, _)| v.id == id)
            .ok_or_else(|| not_found("Volume"))?;
        let tags: Vec<serde_json::Value> = tags
            .iter()
            .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
            .collect();
        Ok(serde_json::json!({ "tags": tags }))
    }

    async fn block_storage_post(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        let id = vendor_volume_id(path).ok_or_else(|| not_found(path))?;
        let request: VolumeTagActionRequest = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::api_error(400, e.to_string(), None))?;

        let action = match request.action {
            TagAction::Create => "create",
            TagAction::Delete => "delete",
        };

        let mut inventory = self.lock();
        for tag in request.tags {
            let call = format!("{action} {id} {}={}", tag.key, tag.value);
            inventory.calls.push(call.clone());
            if inventory.failing_call.as_deref() == Some(call.as_str()) {
                return Err(ProviderError::api_error(
                    409,
                    "Tag action conflicted",
                    Some(serde_json::json!({ "conflictingRequest": { "code": 409 } })),
                )
                .into());
            }

            let (_, current) = inventory
                .volumes
                .iter_mut()
                .find(|(v, _)| v.id == id)
                .ok_or_else(|| not_found("Volume"))?;
            match request.action {
                TagAction::Create => {
                    current.insert(tag.key, tag.value);
                }
                TagAction::Delete => {
                    current.remove(&tag.key);
                }
            }
        }
        Ok(())
    }
}
