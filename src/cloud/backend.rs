//! Tag backend trait definition.
//!
//! A backend binds the reconciler to one resource type: it resolves
//! references, reads tags, and turns a computed [`TagDiff`] into API calls.
//! How a diff is applied (one bulk call, one call per pair) is the backend's
//! business, so a bulk-capable API can replace a per-pair one without any
//! change to reconciliation logic.

use async_trait::async_trait;

use crate::error::{ResourceKind, Result};
use crate::planner::{TagCollection, TagDiff};

use super::types::ResolvedResource;

/// Trait for per-resource-type tag backends.
#[async_trait]
pub trait TagBackend: Send + Sync {
    /// Tag collection shape of this resource type.
    type Tags: TagCollection;

    /// Kind of resource this backend manages.
    fn kind(&self) -> ResourceKind;

    /// Resolves a name or ID to a concrete resource.
    ///
    /// Returns `None` when nothing matches.
    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedResource>>;

    /// Reads the current tags of a resource.
    async fn fetch_tags(&self, resource_id: &str) -> Result<Self::Tags>;

    /// Applies a diff to a resource.
    ///
    /// A failure part way through leaves already-applied mutations in place.
    async fn apply(&self, resource_id: &str, diff: &TagDiff<Self::Tags>) -> Result<()>;
}
