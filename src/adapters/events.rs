//! Kubernetes Event publishing for template resources
//!
//! Events are fire-and-forget: a failed publish is logged and never breaks
//! reconciliation.

use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

use crate::crd::OpensearchComponentTemplate;
use crate::reconcilers::EventNotifier;

/// Field manager and reporting controller name
pub const CONTROLLER_NAME: &str = "opensearch-template-operator";

/// Publishes events through `kube::runtime::events::Recorder`
pub struct KubeEventNotifier {
    client: Client,
    reporter: Reporter,
}

impl KubeEventNotifier {
    pub fn new(client: Client, instance: Option<String>) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: CONTROLLER_NAME.into(),
                instance,
            },
        }
    }
}

#[async_trait]
impl EventNotifier for KubeEventNotifier {
    async fn publish(
        &self,
        template: &OpensearchComponentTemplate,
        type_: EventType,
        reason: &str,
        note: String,
    ) {
        let recorder = Recorder::new(
            self.client.clone(),
            self.reporter.clone(),
            template.object_ref(&()),
        );
        let event = Event {
            type_,
            reason: reason.into(),
            note: Some(note),
            action: "Reconcile".into(),
            secondary: None,
        };
        if let Err(e) = recorder.publish(event).await {
            warn!(reason = %reason, error = %e, "Failed to publish event");
        }
    }
}
