//! Reconciler for resource tags.
//!
//! This module implements the tag reconciliation procedure shared by every
//! resource type: resolve the resource, read its tags, diff them against the
//! desired state, apply the diff, and re-read the tags so the reported
//! result is what the cloud actually holds.

use serde::Serialize;
use tracing::info;

use crate::cloud::TagBackend;
use crate::error::{ResourceKind, Result, TagError};
use crate::planner::{DesiredState, DiffEngine, TagCollection};

/// Reconciler for a single resource's tags.
pub struct TagReconciler<'a, B: TagBackend> {
    /// Backend for the resource type.
    backend: &'a B,
    /// Diff engine.
    diff_engine: DiffEngine,
}

/// Parameters of one tag invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRequest<C: TagCollection> {
    /// Name or ID of the resource.
    pub reference: String,
    /// Desired state of `tags`.
    pub state: DesiredState,
    /// Tags to set or remove.
    pub tags: C,
    /// Compute the outcome without mutating anything.
    pub dry_run: bool,
}

/// Result of a reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagOutcome<C: TagCollection> {
    /// Kind of resource that was reconciled.
    pub kind: ResourceKind,
    /// Whether tags changed (or would have, in a dry run).
    pub changed: bool,
    /// Canonical resource ID.
    pub resource_id: String,
    /// Tags read back from the resource after reconciliation.
    pub tags: C,
    /// Whether mutations were skipped.
    pub dry_run: bool,
}

impl<C: TagCollection> TagRequest<C> {
    /// Creates a request for the given resource.
    #[must_use]
    pub fn new(reference: impl Into<String>, state: DesiredState, tags: C) -> Self {
        Self {
            reference: reference.into(),
            state,
            tags,
            dry_run: false,
        }
    }

    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl<'a, B: TagBackend> TagReconciler<'a, B> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self {
            backend,
            diff_engine: DiffEngine::new(),
        }
    }

    /// Reconciles a resource's tags with the request.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::ResourceNotFound`] if the reference does not
    /// resolve, or the provider error of the first failing API call.
    /// Mutations applied before a failure are not rolled back.
    pub async fn reconcile(&self, request: &TagRequest<B::Tags>) -> Result<TagOutcome<B::Tags>> {
        let kind = self.backend.kind();
        info!(
            "Reconciling {kind} tags for {} (state: {}, dry run: {})",
            request.reference, request.state, request.dry_run
        );

        let resource = self
            .backend
            .resolve(&request.reference)
            .await?
            .ok_or_else(|| TagError::not_found(kind, &request.reference))?;

        let current = self.backend.fetch_tags(&resource.id).await?;
        let diff = self
            .diff_engine
            .compute(request.state, &current, &request.tags);

        if diff.is_noop() {
            info!("No changes required - {kind} {} is converged", resource.id);
        } else if request.dry_run {
            info!("Dry run - would apply to {kind} {}: {diff}", resource.id);
        } else {
            self.backend.apply(&resource.id, &diff).await?;
            info!("Applied to {kind} {}: {diff}", resource.id);
        }

        // Report the tags the cloud holds now.
        let tags = self.backend.fetch_tags(&resource.id).await?;

        Ok(TagOutcome {
            kind,
            changed: diff.changed,
            resource_id: resource.id,
            tags,
            dry_run: request.dry_run,
        })
    }
}

impl<C: TagCollection> TagOutcome<C> {
    /// Builds the success report: `{changed, <kind>: id, tags}`.
    #[must_use]
    pub fn to_report(&self) -> serde_json::Value {
        let mut report = serde_json::Map::new();
        report.insert("changed".to_string(), self.changed.into());
        report.insert(self.kind.to_string(), self.resource_id.clone().into());
        report.insert(
            "tags".to_string(),
            serde_json::to_value(&self.tags).unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(report)
    }
}

impl std::fmt::Display for TagOutcome<crate::planner::ServerTags> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.changed { "changed" } else { "ok" };
        write!(f, "server {}: {status} [", self.resource_id)?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tag}")?;
        }
        write!(f, "]")
    }
}

impl std::fmt::Display for TagOutcome<crate::planner::VolumeTags> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.changed { "changed" } else { "ok" };
        write!(f, "volume {}: {status} {{", self.resource_id)?;
        for (i, (key, value)) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{FakeCloud, MockCloudApi, Server, ServerTagBackend, VolumeTagBackend};
    use crate::error::ProviderError;
    use crate::planner::{ServerTags, VolumeTags};

    const SERVER_ID: &str = "2f66c03e-a9ab-414c-925a-03eb14871456";

    fn server_tags(tags: &[&str]) -> ServerTags {
        tags.iter().copied().collect()
    }

    fn volume_tags(tags: &[(&str, &str)]) -> VolumeTags {
        tags.iter().copied().collect()
    }

    async fn reconcile_server(
        cloud: &FakeCloud,
        state: DesiredState,
        tags: &[&str],
        dry_run: bool,
    ) -> Result<TagOutcome<ServerTags>> {
        let backend = ServerTagBackend::new(cloud);
        let request = TagRequest::new("web-01", state, server_tags(tags)).with_dry_run(dry_run);
        TagReconciler::new(&backend).reconcile(&request).await
    }

    #[tokio::test]
    async fn test_server_present_adds_missing_tag() {
        let cloud = FakeCloud::new().with_server(SERVER_ID, "web-01", &["env.prod"]);

        let outcome = reconcile_server(&cloud, DesiredState::Present, &["env.prod", "team.x"], false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.resource_id, SERVER_ID);
        assert_eq!(outcome.tags, server_tags(&["env.prod", "team.x"]));
        assert_eq!(
            cloud.calls(),
            vec![format!("set_server_tags {SERVER_ID} env.prod,team.x")]
        );
    }

    #[tokio::test]
    async fn test_server_present_is_idempotent() {
        let cloud = FakeCloud::new().with_server(SERVER_ID, "web-01", &[]);
        let desired = ["a", "b"];

        let first = reconcile_server(&cloud, DesiredState::Present, &desired, false)
            .await
            .unwrap();
        let second = reconcile_server(&cloud, DesiredState::Present, &desired, false)
            .await
            .unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.tags, server_tags(&desired));
        assert_eq!(second.tags, server_tags(&desired));
        assert_eq!(cloud.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_server_absent_subtracts() {
        let cloud = FakeCloud::new().with_server(SERVER_ID, "web-01", &["a", "b"]);

        let outcome = reconcile_server(&cloud, DesiredState::Absent, &["a"], false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.tags, server_tags(&["b"]));
        assert_eq!(cloud.calls(), vec![format!("remove_server_tag {SERVER_ID} a")]);
    }

    #[tokio::test]
    async fn test_server_absent_missing_tag_is_noop() {
        let cloud = FakeCloud::new().with_server(SERVER_ID, "web-01", &["a"]);

        let outcome = reconcile_server(&cloud, DesiredState::Absent, &["z"], false)
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.tags, server_tags(&["a"]));
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_never_mutates() {
        let cloud = FakeCloud::new().with_server(SERVER_ID, "web-01", &["a"]);

        let dry = reconcile_server(&cloud, DesiredState::Present, &["a", "b"], true)
            .await
            .unwrap();
        assert!(dry.changed);
        assert!(dry.dry_run);
        assert_eq!(dry.tags, server_tags(&["a"]));

        let dry = reconcile_server(&cloud, DesiredState::Absent, &["a"], true)
            .await
            .unwrap();
        assert!(dry.changed);

        // A no-op check afterwards still sees the untouched tags.
        let check = reconcile_server(&cloud, DesiredState::Present, &["a"], false)
            .await
            .unwrap();
        assert!(!check.changed);
        assert_eq!(check.tags, server_tags(&["a"]));
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_resource_fails_for_every_state() {
        let cloud = FakeCloud::new();

        for state in [DesiredState::Present, DesiredState::Absent] {
            let err = reconcile_server(&cloud, state, &["a"], false)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                TagError::ResourceNotFound {
                    kind: ResourceKind::Server,
                    ..
                }
            ));

            let backend = VolumeTagBackend::new(&cloud);
            let request = TagRequest::new("missing", state, volume_tags(&[("k", "v")]));
            let err = TagReconciler::new(&backend)
                .reconcile(&request)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                TagError::ResourceNotFound {
                    kind: ResourceKind::Volume,
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_volume_absent_deletes_present_key() {
        let cloud = FakeCloud::new().with_volume("vol-1", "data", &[("env", "prod")]);
        let backend = VolumeTagBackend::new(&cloud);
        let request = TagRequest::new("vol-1", DesiredState::Absent, volume_tags(&[("env", "prod")]));

        let outcome = TagReconciler::new(&backend).reconcile(&request).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.resource_id, "vol-1");
        assert_eq!(outcome.tags, VolumeTags::new());
        assert_eq!(cloud.calls(), vec!["delete vol-1 env=prod".to_string()]);
    }

    #[tokio::test]
    async fn test_volume_present_creates_each_pair_and_keeps_extras() {
        let cloud = FakeCloud::new().with_volume("vol-1", "data", &[("owner", "ops")]);
        let backend = VolumeTagBackend::new(&cloud);
        let request = TagRequest::new(
            "data",
            DesiredState::Present,
            volume_tags(&[("env", "prod"), ("team", "x")]),
        );

        let outcome = TagReconciler::new(&backend).reconcile(&request).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(
            outcome.tags,
            volume_tags(&[("env", "prod"), ("owner", "ops"), ("team", "x")])
        );
        assert_eq!(
            cloud.calls(),
            vec!["create vol-1 env=prod".to_string(), "create vol-1 team=x".to_string()]
        );
    }

    #[tokio::test]
    async fn test_volume_dry_run_never_mutates() {
        let cloud = FakeCloud::new().with_volume("vol-1", "data", &[("env", "prod")]);
        let backend = VolumeTagBackend::new(&cloud);
        let reconciler = TagReconciler::new(&backend);

        let create = TagRequest::new("data", DesiredState::Present, volume_tags(&[("team", "x")]))
            .with_dry_run(true);
        let outcome = reconciler.reconcile(&create).await.unwrap();
        assert!(outcome.changed);
        assert!(outcome.dry_run);
        assert_eq!(outcome.tags, volume_tags(&[("env", "prod")]));

        let delete = TagRequest::new("data", DesiredState::Absent, volume_tags(&[("env", "prod")]))
            .with_dry_run(true);
        let outcome = reconciler.reconcile(&delete).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.tags, volume_tags(&[("env", "prod")]));

        assert!(cloud.calls().is_empty());
        assert_eq!(
            backend.fetch_tags("vol-1").await.unwrap(),
            volume_tags(&[("env", "prod")])
        );
    }

    #[tokio::test]
    async fn test_volume_failure_keeps_earlier_pairs() {
        let cloud = FakeCloud::new()
            .with_volume("vol-1", "data", &[])
            .fail_on("create vol-1 team=x");
        let backend = VolumeTagBackend::new(&cloud);
        let request = TagRequest::new(
            "data",
            DesiredState::Present,
            volume_tags(&[("env", "prod"), ("team", "x")]),
        );

        let err = TagReconciler::new(&backend)
            .reconcile(&request)
            .await
            .unwrap_err();
        assert_eq!(
            err.extra_data(),
            Some(&serde_json::json!({ "conflictingRequest": { "code": 409 } }))
        );

        // The first pair was applied before the failure and stays.
        assert_eq!(
            cloud.calls(),
            vec!["create vol-1 env=prod".to_string(), "create vol-1 team=x".to_string()]
        );
        assert_eq!(
            backend.fetch_tags("vol-1").await.unwrap(),
            volume_tags(&[("env", "prod")])
        );
    }

    #[tokio::test]
    async fn test_failure_mid_apply_propagates_provider_error() {
        let mut api = MockCloudApi::new();
        api.expect_find_server().returning(|_| {
            Ok(Some(Server {
                id: SERVER_ID.to_string(),
                name: "web-01".to_string(),
            }))
        });
        api.expect_server_tags()
            .times(1)
            .returning(|_| Ok(vec!["a".to_string()]));
        api.expect_set_server_tags().times(1).returning(|_, _| {
            Err(ProviderError::api_error(
                409,
                "Conflict",
                Some(serde_json::json!({ "conflictingRequest": { "code": 409 } })),
            )
            .into())
        });

        let backend = ServerTagBackend::new(&api);
        let request = TagRequest::new("web-01", DesiredState::Present, server_tags(&["a", "b"]));
        let err = TagReconciler::new(&backend)
            .reconcile(&request)
            .await
            .unwrap_err();

        assert!(err.extra_data().is_some());
        assert!(err.to_string().contains("Conflict"));
    }

    #[test]
    fn test_report_uses_resource_kind_key() {
        let outcome = TagOutcome {
            kind: ResourceKind::Volume,
            changed: true,
            resource_id: "vol-1".to_string(),
            tags: volume_tags(&[("env", "prod")]),
            dry_run: false,
        };
        assert_eq!(
            outcome.to_report(),
            serde_json::json!({ "changed": true, "volume": "vol-1", "tags": { "env": "prod" } })
        );
        assert_eq!(outcome.to_string(), "volume vol-1: changed {env: prod}");
    }
}
