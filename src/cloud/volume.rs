//! Volume tag backend.
//!
//! Volume tags live on a vendor sub-resource of the block-storage API rather
//! than a first-class endpoint:
//!
//! - `GET  /os-vendor-volumes/{id}/tags` lists the key/value pairs.
//! - `POST /os-vendor-volumes/{id}/tags/action` creates or deletes pairs.
//!
//! The backend accepts one pair per action call, so mutations are issued one
//! request per pair.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ProviderError, ResourceKind, Result};
use crate::planner::{TagCollection, TagDiff, VolumeTag, VolumeTags};

use super::api::CloudApi;
use super::backend::TagBackend;
use super::types::{ResolvedResource, TagAction, VolumeTagActionRequest, VolumeTagList};

/// Tag backend for block-storage volumes.
#[derive(Debug)]
pub struct VolumeTagBackend<'a, A: CloudApi + ?Sized> {
    /// Cloud API client.
    api: &'a A,
}

impl<'a, A: CloudApi + ?Sized> VolumeTagBackend<'a, A> {
    /// Creates a new volume tag backend.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Sends a single-pair tag action.
    async fn tag_action(&self, volume_id: &str, action: TagAction, tag: VolumeTag) -> Result<()> {
        let request = VolumeTagActionRequest {
            action,
            tags: vec![tag],
        };
        let body = serde_json::to_value(&request).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to encode tag action: {e}"))
        })?;
        self.api
            .block_storage_post(&action_path(volume_id), &body)
            .await
    }
}

/// Path of a volume's tag list.
#[must_use]
pub fn tags_path(volume_id: &str) -> String {
    format!("/os-vendor-volumes/{volume_id}/tags")
}

/// Path of a volume's tag action endpoint.
#[must_use]
pub fn action_path(volume_id: &str) -> String {
    format!("/os-vendor-volumes/{volume_id}/tags/action")
}

#[async_trait]
impl<A: CloudApi + ?Sized> TagBackend for VolumeTagBackend<'_, A> {
    type Tags = VolumeTags;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Volume
    }

    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedResource>> {
        let volume = self.api.find_volume(reference).await?;
        Ok(volume.map(ResolvedResource::from))
    }

    async fn fetch_tags(&self, resource_id: &str) -> Result<VolumeTags> {
        let body = self.api.block_storage_get(&tags_path(resource_id)).await?;
        let list: VolumeTagList = serde_json::from_value(body).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to parse volume tags: {e}"))
        })?;
        debug!("Volume {resource_id} has {} tags", list.tags.len());
        Ok(list.tags.into_iter().collect())
    }

    async fn apply(&self, resource_id: &str, diff: &TagDiff<VolumeTags>) -> Result<()> {
        if let Some(tags) = &diff.to_set {
            for tag in tags.entries() {
                info!("Creating tag {tag} on volume {resource_id}");
                self.tag_action(resource_id, TagAction::Create, tag).await?;
            }
        }

        for tag in &diff.to_remove {
            info!("Deleting tag {tag} from volume {resource_id}");
            self.tag_action(resource_id, TagAction::Delete, tag.clone())
                .await?;
        }

        Ok(())
    }
}
