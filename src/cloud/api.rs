//! Cloud API client interface.
//!
//! This module defines the surface of the cloud control-plane API that the
//! tag backends consume. The live implementation is
//! [`OpenStackClient`](super::OpenStackClient); tests inject fakes.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{Server, Volume};

/// Operations the tag backends need from a cloud API client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Looks up a server by name or ID.
    ///
    /// Returns `None` when nothing matches.
    async fn find_server(&self, reference: &str) -> Result<Option<Server>>;

    /// Fetches the tags of a server.
    async fn server_tags(&self, server_id: &str) -> Result<Vec<String>>;

    /// Replaces all tags of a server.
    async fn set_server_tags(&self, server_id: &str, tags: &[String]) -> Result<()>;

    /// Removes a single tag from a server.
    async fn remove_server_tag(&self, server_id: &str, tag: &str) -> Result<()>;

    /// Looks up a volume by name or ID.
    ///
    /// Returns `None` when nothing matches.
    async fn find_volume(&self, reference: &str) -> Result<Option<Volume>>;

    /// Issues an authenticated `GET` against the block-storage endpoint.
    ///
    /// `path` is relative to the endpoint, e.g. `/os-vendor-volumes/{id}/tags`.
    async fn block_storage_get(&self, path: &str) -> Result<serde_json::Value>;

    /// Issues an authenticated JSON `POST` against the block-storage endpoint.
    async fn block_storage_post(&self, path: &str, body: &serde_json::Value) -> Result<()>;
}
