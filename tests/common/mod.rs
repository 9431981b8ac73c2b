//! In-memory collaborators for driving the reconciler without a cluster

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::runtime::events::EventType;
use tokio_util::sync::CancellationToken;

use opensearch_template_operator::crd::{
    ClusterReference, ComponentTemplateSpec, ComponentTemplateStatus, OpenSearchCluster,
    OpenSearchClusterSpec, OpenSearchClusterStatus, OpensearchComponentTemplate, TemplateSpec,
    PHASE_RUNNING,
};
use opensearch_template_operator::opensearch::ComponentTemplateBody;
use opensearch_template_operator::reconcilers::{
    ClusterResolver, ComponentTemplateReconciler, EventNotifier, Intervals, ReconcilerOptions,
    Requeue, RetryConfig, Services, StatusStore, TemplateGateway, TemplateSession,
};
use opensearch_template_operator::{Error, Result};

pub const NAMESPACE: &str = "search";
pub const CLUSTER: &str = "logging";
pub const CLUSTER_UID: &str = "3f1c2a9e-0000-4000-8000-000000000001";

// ============================================================================
// Fixtures
// ============================================================================

pub fn template(name: &str) -> OpensearchComponentTemplate {
    let mut settings = serde_json::Map::new();
    settings.insert("number_of_shards".to_string(), serde_json::json!(1));

    OpensearchComponentTemplate {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: ComponentTemplateSpec {
            opensearch_cluster: ClusterReference {
                name: CLUSTER.to_string(),
            },
            template: TemplateSpec {
                settings: Some(serde_json::Value::Object(settings)),
                ..Default::default()
            },
            version: Some(1),
            ..Default::default()
        },
        status: None,
    }
}

pub fn cluster(uid: &str, phase: &str) -> OpenSearchCluster {
    OpenSearchCluster {
        metadata: ObjectMeta {
            name: Some(CLUSTER.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            uid: Some(uid.to_string()),
            ..Default::default()
        },
        spec: OpenSearchClusterSpec::default(),
        status: Some(OpenSearchClusterStatus {
            phase: Some(phase.to_string()),
        }),
    }
}

pub fn running_cluster() -> OpenSearchCluster {
    cluster(CLUSTER_UID, PHASE_RUNNING)
}

pub fn deleting_cluster() -> OpenSearchCluster {
    let mut cluster = running_cluster();
    cluster.metadata.deletion_timestamp = Some(Time(k8s_openapi::chrono::Utc::now()));
    cluster
}

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
pub struct FakeClusters {
    pub cluster: Mutex<Option<OpenSearchCluster>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl ClusterResolver for FakeClusters {
    async fn resolve(&self, _namespace: &str, _name: &str) -> Result<Option<OpenSearchCluster>> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Config("cluster lookup failed".to_string()));
        }
        Ok(self.cluster.lock().unwrap().clone())
    }
}

/// Remote template store with a log of every call made against it
#[derive(Default)]
pub struct FakeSession {
    pub templates: Mutex<BTreeMap<String, ComponentTemplateBody>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_exists: Mutex<bool>,
    pub fail_differs: Mutex<bool>,
    pub fail_upsert: Mutex<bool>,
    pub fail_delete: Mutex<bool>,
}

impl FakeSession {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn mutations(&self) -> usize {
        self.count("upsert") + self.count("delete")
    }

    fn record(&self, op: &str, name: &str) {
        self.calls.lock().unwrap().push(format!("{}:{}", op, name));
    }
}

fn unavailable() -> Error {
    Error::OpenSearchApi {
        status: 503,
        body: "cluster_block_exception".to_string(),
    }
}

struct SessionHandle(Arc<FakeSession>);

#[async_trait]
impl TemplateSession for SessionHandle {
    async fn template_exists(&self, name: &str) -> Result<bool> {
        self.0.record("exists", name);
        if *self.0.fail_exists.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(self.0.templates.lock().unwrap().contains_key(name))
    }

    async fn template_differs(&self, name: &str, desired: &ComponentTemplateBody) -> Result<bool> {
        self.0.record("differs", name);
        if *self.0.fail_differs.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(match self.0.templates.lock().unwrap().get(name) {
            Some(existing) => desired.differs_from(existing),
            None => true,
        })
    }

    async fn upsert_template(&self, name: &str, desired: &ComponentTemplateBody) -> Result<()> {
        self.0.record("upsert", name);
        if *self.0.fail_upsert.lock().unwrap() {
            return Err(Error::OpenSearchApi {
                status: 400,
                body: "mapper_parsing_exception".to_string(),
            });
        }
        self.0
            .templates
            .lock()
            .unwrap()
            .insert(name.to_string(), desired.clone());
        Ok(())
    }

    async fn delete_template(&self, name: &str) -> Result<()> {
        self.0.record("delete", name);
        if *self.0.fail_delete.lock().unwrap() {
            return Err(unavailable());
        }
        self.0.templates.lock().unwrap().remove(name);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub session: Arc<FakeSession>,
    pub connects: Mutex<u32>,
    pub fail_connect: Mutex<bool>,
}

#[async_trait]
impl TemplateGateway for FakeGateway {
    async fn connect(&self, _cluster: &OpenSearchCluster) -> Result<Box<dyn TemplateSession>> {
        *self.connects.lock().unwrap() += 1;
        if *self.fail_connect.lock().unwrap() {
            return Err(Error::SecretNotFound(format!("{}/admin-credentials", NAMESPACE)));
        }
        Ok(Box::new(SessionHandle(self.session.clone())))
    }
}

/// Persisted resource; status writes replace only the status
pub struct FakeStore {
    pub stored: Mutex<OpensearchComponentTemplate>,
    pub conflicts: Mutex<u32>,
    pub writes: Mutex<u32>,
}

impl FakeStore {
    pub fn new(template: OpensearchComponentTemplate) -> Self {
        Self {
            stored: Mutex::new(template),
            conflicts: Mutex::new(0),
            writes: Mutex::new(0),
        }
    }
}

#[async_trait]
impl StatusStore for FakeStore {
    async fn get_latest(&self, _namespace: &str, _name: &str) -> Result<OpensearchComponentTemplate> {
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn replace_status(
        &self,
        template: &OpensearchComponentTemplate,
    ) -> Result<OpensearchComponentTemplate> {
        let mut conflicts = self.conflicts.lock().unwrap();
        if *conflicts > 0 {
            *conflicts -= 1;
            return Err(Error::Conflict("the object has been modified".to_string()));
        }
        *self.writes.lock().unwrap() += 1;
        let mut stored = self.stored.lock().unwrap();
        stored.status = template.status.clone();
        Ok(stored.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub warning: bool,
    pub reason: String,
    pub note: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingNotifier {
    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.reason.clone())
            .collect()
    }
}

#[async_trait]
impl EventNotifier for RecordingNotifier {
    async fn publish(
        &self,
        _template: &OpensearchComponentTemplate,
        type_: EventType,
        reason: &str,
        note: String,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            note,
        });
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub clusters: Arc<FakeClusters>,
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<FakeStore>,
    pub events: Arc<RecordingNotifier>,
    pub services: Services,
    pub options: ReconcilerOptions,
}

impl Harness {
    pub fn new(template: OpensearchComponentTemplate) -> Self {
        let clusters = Arc::new(FakeClusters::default());
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(FakeStore::new(template));
        let events = Arc::new(RecordingNotifier::default());
        let services = Services {
            clusters: clusters.clone(),
            gateway: gateway.clone(),
            store: store.clone(),
            events: events.clone(),
        };
        let options = ReconcilerOptions {
            persist_status: true,
            intervals: Intervals {
                pending: Duration::from_secs(10),
                sync: Duration::from_secs(30),
            },
            status_retry: RetryConfig {
                initial_delay: Duration::from_millis(1),
                ..RetryConfig::default()
            },
        };

        Self {
            clusters,
            gateway,
            store,
            events,
            services,
            options,
        }
    }

    pub fn with_cluster(self, cluster: OpenSearchCluster) -> Self {
        *self.clusters.cluster.lock().unwrap() = Some(cluster);
        self
    }

    pub fn session(&self) -> &FakeSession {
        &self.gateway.session
    }

    /// Seed a template that already exists in OpenSearch
    pub fn remote(&self, name: &str, body: ComponentTemplateBody) {
        self.session()
            .templates
            .lock()
            .unwrap()
            .insert(name.to_string(), body);
    }

    pub fn status(&self) -> ComponentTemplateStatus {
        self.store.stored.lock().unwrap().current_status()
    }

    /// Apply a user edit to the persisted resource
    pub fn edit(&self, edit: impl FnOnce(&mut OpensearchComponentTemplate)) {
        edit(&mut self.store.stored.lock().unwrap());
    }

    fn latest(&self) -> OpensearchComponentTemplate {
        self.store.stored.lock().unwrap().clone()
    }

    pub async fn reconcile(&self) -> Result<Requeue> {
        self.reconcile_with(CancellationToken::new()).await
    }

    pub async fn reconcile_with(&self, cancel: CancellationToken) -> Result<Requeue> {
        let mut reconciler =
            ComponentTemplateReconciler::new(&self.services, &self.options, cancel, self.latest());
        reconciler.reconcile().await
    }

    pub async fn delete(&self) -> Result<()> {
        let mut reconciler = ComponentTemplateReconciler::new(
            &self.services,
            &self.options,
            CancellationToken::new(),
            self.latest(),
        );
        reconciler.delete().await
    }
}
