//! Server tag backend.
//!
//! Compute tags are plain labels. The desired collection is written with a
//! single bulk call; removals go one tag at a time.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ResourceKind, Result};
use crate::planner::{ServerTags, TagCollection, TagDiff};

use super::api::CloudApi;
use super::backend::TagBackend;
use super::types::ResolvedResource;

/// Tag backend for compute instances.
#[derive(Debug)]
pub struct ServerTagBackend<'a, A: CloudApi + ?Sized> {
    /// Cloud API client.
    api: &'a A,
}

impl<'a, A: CloudApi + ?Sized> ServerTagBackend<'a, A> {
    /// Creates a new server tag backend.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: CloudApi + ?Sized> TagBackend for ServerTagBackend<'_, A> {
    type Tags = ServerTags;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Server
    }

    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedResource>> {
        let server = self.api.find_server(reference).await?;
        Ok(server.map(ResolvedResource::from))
    }

    async fn fetch_tags(&self, resource_id: &str) -> Result<ServerTags> {
        let tags = self.api.server_tags(resource_id).await?;
        debug!("Server {resource_id} has {} tags", tags.len());
        Ok(tags.into())
    }

    async fn apply(&self, resource_id: &str, diff: &TagDiff<ServerTags>) -> Result<()> {
        if let Some(tags) = &diff.to_set {
            info!("Setting {} tags on server {resource_id}", tags.len());
            self.api.set_server_tags(resource_id, &tags.to_vec()).await?;
        }

        for tag in &diff.to_remove {
            info!("Removing tag '{tag}' from server {resource_id}");
            self.api.remove_server_tag(resource_id, tag).await?;
        }

        Ok(())
    }
}
