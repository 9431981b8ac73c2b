//! Collaborators the template reconciler drives.
//!
//! Each trait abstracts one external system so the reconciler can run
//! against the Kubernetes API and OpenSearch in production and against
//! in-memory fakes in tests.

use std::sync::Arc;

use async_trait::async_trait;
use kube::runtime::events::EventType;

use crate::crd::{OpenSearchCluster, OpensearchComponentTemplate};
use crate::error::Result;
use crate::opensearch::ComponentTemplateBody;

/// Looks up the cluster a template refers to
#[async_trait]
pub trait ClusterResolver: Send + Sync {
    /// `Ok(None)` when the cluster does not exist
    async fn resolve(&self, namespace: &str, name: &str) -> Result<Option<OpenSearchCluster>>;
}

/// Opens API sessions against a cluster
#[async_trait]
pub trait TemplateGateway: Send + Sync {
    async fn connect(&self, cluster: &OpenSearchCluster) -> Result<Box<dyn TemplateSession>>;
}

/// Component template operations on one cluster
#[async_trait]
pub trait TemplateSession: Send + Sync {
    async fn template_exists(&self, name: &str) -> Result<bool>;

    /// True when the stored template is absent or differs from `desired`
    async fn template_differs(&self, name: &str, desired: &ComponentTemplateBody) -> Result<bool>;

    /// Create or overwrite the template
    async fn upsert_template(&self, name: &str, desired: &ComponentTemplateBody) -> Result<()>;

    async fn delete_template(&self, name: &str) -> Result<()>;
}

/// Reads and writes the persisted template resource
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Fetch the latest persisted copy
    async fn get_latest(&self, namespace: &str, name: &str)
        -> Result<OpensearchComponentTemplate>;

    /// Persist the status of `template`.
    ///
    /// Fails with [`crate::Error::Conflict`] when the stored resource version
    /// no longer matches the one carried by `template`.
    async fn replace_status(
        &self,
        template: &OpensearchComponentTemplate,
    ) -> Result<OpensearchComponentTemplate>;
}

/// Fire-and-forget audit events
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn publish(
        &self,
        template: &OpensearchComponentTemplate,
        type_: EventType,
        reason: &str,
        note: String,
    );
}

/// Bundle of collaborators shared by every reconciliation
#[derive(Clone)]
pub struct Services {
    pub clusters: Arc<dyn ClusterResolver>,
    pub gateway: Arc<dyn TemplateGateway>,
    pub store: Arc<dyn StatusStore>,
    pub events: Arc<dyn EventNotifier>,
}
