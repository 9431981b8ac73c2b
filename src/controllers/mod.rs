//! Kubernetes controllers for OpenSearch template CRDs
//!
//! This module contains the controller implementation that watches for CRD
//! changes and triggers reconciliation.

mod component_template_controller;

pub use component_template_controller::{requeue_after, run as run_component_template_controller};

use std::sync::Arc;

use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::adapters::{KubeClusterResolver, KubeEventNotifier, KubeStatusStore, KubeTemplateGateway};
use crate::config::OperatorConfig;
use crate::opensearch::ClientOptions;
use crate::reconcilers::{Intervals, ReconcilerOptions, RetryConfig, Services};

/// Shared context for all controllers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Operator configuration
    pub config: OperatorConfig,
    /// Collaborators used by the reconcilers
    pub services: Services,
    /// Reconciler behaviour
    pub options: ReconcilerOptions,
    /// Cancelled when the operator shuts down
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a new context backed by the Kubernetes API
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        let client_options = ClientOptions {
            timeout: config.request_timeout,
            skip_tls_verify: config.skip_tls_verify,
        };
        let services = Services {
            clusters: Arc::new(KubeClusterResolver::new(client.clone())),
            gateway: Arc::new(KubeTemplateGateway::new(
                client.clone(),
                config.cluster_domain.clone(),
                client_options,
            )),
            store: Arc::new(KubeStatusStore::new(client.clone())),
            events: Arc::new(KubeEventNotifier::new(client.clone(), config.pod_name.clone())),
        };
        let options = ReconcilerOptions {
            persist_status: true,
            intervals: Intervals {
                pending: config.pending_requeue,
                sync: config.sync_requeue,
            },
            status_retry: RetryConfig::default(),
        };

        Self {
            client,
            config,
            services,
            options,
            shutdown: CancellationToken::new(),
        }
    }
}
