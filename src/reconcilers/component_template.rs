//! OpensearchComponentTemplate reconciler
//!
//! Drives a declared component template toward the copy stored in its
//! OpenSearch cluster:
//! - Pins the owning cluster and refuses to follow a changed reference
//! - Decides once whether the remote template pre-existed (and is left alone)
//! - Pins the remote template name and refuses renames
//! - Pushes the translated spec whenever the remote copy drifts
//! - Removes owned templates when the resource is deleted
//!
//! Every invocation ends with a single status write derived from its outcome.

use std::future::Future;

use kube::runtime::events::EventType;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::collaborators::{Services, TemplateSession};
use super::outcome::{reasons, transition, Failure, Intervals, Outcome, Requeue};
use super::status::{update_status, RetryConfig};
use crate::adapters::to_component_template_body;
use crate::crd::{OpenSearchCluster, OpensearchComponentTemplate, TemplateExistence};
use crate::error::{Error, Result};
use crate::metrics;

const CLUSTER_FETCH_FAILED: &str = "error fetching opensearch cluster";
const CLUSTER_REF_CHANGED: &str = "cannot change the cluster a component template refers to";
const CLIENT_FAILED: &str = "error creating opensearch client";
const TEMPLATE_STATUS_FAILED: &str = "failed to get component template status from OpenSearch API";
const TEMPLATE_NAME_CHANGED: &str = "cannot change the component template name";
const TEMPLATE_UPDATE_FAILED: &str = "failed to update component template with OpenSearch API";

/// Knobs for a reconciler instance
#[derive(Clone, Debug)]
pub struct ReconcilerOptions {
    /// Write status; when false the reconciler stops right after the
    /// existence check and reports it through an event instead
    pub persist_status: bool,
    pub intervals: Intervals,
    pub status_retry: RetryConfig,
}

/// Reconciles one OpensearchComponentTemplate
pub struct ComponentTemplateReconciler<'a> {
    services: &'a Services,
    options: &'a ReconcilerOptions,
    cancel: CancellationToken,
    instance: OpensearchComponentTemplate,
}

impl<'a> ComponentTemplateReconciler<'a> {
    pub fn new(
        services: &'a Services,
        options: &'a ReconcilerOptions,
        cancel: CancellationToken,
        instance: OpensearchComponentTemplate,
    ) -> Self {
        Self {
            services,
            options,
            cancel,
            instance,
        }
    }

    /// Latest copy of the resource seen by this reconciler
    pub fn instance(&self) -> &OpensearchComponentTemplate {
        &self.instance
    }

    /// Run one reconciliation and record its outcome in status.
    ///
    /// Errors are returned to the scheduler for backoff; the status write
    /// itself never fails the invocation.
    #[instrument(skip(self), fields(name = %self.instance.name_any(), namespace = %self.namespace()))]
    pub async fn reconcile(&mut self) -> Result<Requeue> {
        let result = self.sync().await;
        let transition = transition(&result);

        if self.options.persist_status {
            let state = transition.state;
            let reason = transition.reason.clone();
            let written = self
                .write_status(move |mut template| {
                    let status = template.status_mut();
                    status.reason = reason.clone();
                    if let Some(state) = state {
                        status.state = Some(state);
                    }
                    template
                })
                .await;
            if let Err(e) = written {
                error!(error = %e, "failed to update status");
            }
        }

        if let Some(state) = transition.state {
            metrics::TEMPLATE_STATES
                .with_label_values(&[state.as_str(), &self.namespace()])
                .inc();
        }

        match result {
            Ok(outcome) => Ok(outcome.requeue(&self.options.intervals)),
            Err(failure) => Err(failure.error),
        }
    }

    async fn sync(&mut self) -> std::result::Result<Outcome, Failure> {
        let namespace = self.namespace();
        let cluster_name = self.instance.spec.opensearch_cluster.name.clone();

        let cluster = match self
            .guard(self.services.clusters.resolve(&namespace, &cluster_name))
            .await
        {
            Ok(Some(cluster)) => cluster,
            Ok(None) => {
                info!(cluster = %cluster_name, "opensearch cluster does not exist, requeueing");
                return Ok(self.wait(Outcome::ClusterMissing).await);
            }
            Err(e) => {
                error!(error = %e, "failed to fetch opensearch cluster");
                return Err(self
                    .fail(reasons::OPENSEARCH_ERROR, CLUSTER_FETCH_FAILED, e)
                    .await);
            }
        };

        self.check_cluster_ownership(&cluster).await?;

        if !cluster.is_running() {
            info!(cluster = %cluster_name, "opensearch cluster is not running, requeueing");
            return Ok(self.wait(Outcome::ClusterNotReady).await);
        }

        let session = match self.guard(self.services.gateway.connect(&cluster)).await {
            Ok(session) => session,
            Err(e) => return Err(self.fail(reasons::OPENSEARCH_ERROR, CLIENT_FAILED, e).await),
        };

        let template_name = self.instance.template_name();

        let existence = match self.instance.current_status().existing_component_template {
            TemplateExistence::Unknown => {
                let exists = match self.guard(session.template_exists(&template_name)).await {
                    Ok(exists) => exists,
                    Err(e) => {
                        error!(error = %e, "{}", TEMPLATE_STATUS_FAILED);
                        return Err(self
                            .fail(reasons::OPENSEARCH_API_ERROR, TEMPLATE_STATUS_FAILED, e)
                            .await);
                    }
                };

                if !self.options.persist_status {
                    self.notify(
                        EventType::Normal,
                        reasons::EXISTENCE_CHECKED,
                        format!("exists is {}", exists),
                    )
                    .await;
                    return Ok(Outcome::ExistenceRecorded { exists });
                }

                let existence = TemplateExistence::from(exists);
                let pinned_name = template_name.clone();
                self.pin(move |mut template| {
                    let status = template.status_mut();
                    status.existing_component_template = existence;
                    status.component_template_name = Some(pinned_name.clone());
                    template
                })
                .await?;
                existence
            }
            known => known,
        };

        if existence == TemplateExistence::PreExisting {
            return Ok(Outcome::Adopted);
        }

        self.check_template_name(&template_name).await?;

        let desired = to_component_template_body(&self.instance.spec);

        let differs = match self
            .guard(session.template_differs(&template_name, &desired))
            .await
        {
            Ok(differs) => differs,
            Err(e) => {
                error!(error = %e, "{}", TEMPLATE_STATUS_FAILED);
                return Err(self
                    .fail(reasons::OPENSEARCH_API_ERROR, TEMPLATE_STATUS_FAILED, e)
                    .await);
            }
        };

        if !differs {
            debug!(template = %template_name, "component template is in sync");
            return Ok(Outcome::InSync);
        }

        if let Err(e) = self
            .guard(session.upsert_template(&template_name, &desired))
            .await
        {
            error!(error = %e, "{}", TEMPLATE_UPDATE_FAILED);
            self.count_upsert("failure");
            let error = Error::TemplateSync {
                name: template_name,
                source: Box::new(e),
            };
            return Err(self
                .fail(reasons::OPENSEARCH_API_ERROR, TEMPLATE_UPDATE_FAILED, error)
                .await);
        }

        self.count_upsert("success");
        info!(template = %template_name, "component template updated in opensearch");
        self.notify(
            EventType::Normal,
            reasons::OPENSEARCH_API_UPDATED,
            "component template updated in opensearch".to_string(),
        )
        .await;

        Ok(Outcome::Updated)
    }

    /// Pin the owning cluster on first sight, reject a different one after
    async fn check_cluster_ownership(
        &mut self,
        cluster: &OpenSearchCluster,
    ) -> std::result::Result<(), Failure> {
        let observed = cluster.identity();
        match self.instance.current_status().managed_cluster {
            Some(pinned) if pinned != observed => {
                let error = Error::ClusterRefMismatch { pinned, observed };
                Err(self
                    .fail(reasons::OPENSEARCH_REF_MISMATCH, CLUSTER_REF_CHANGED, error)
                    .await)
            }
            Some(_) => Ok(()),
            None if self.options.persist_status => {
                self.pin(move |mut template| {
                    template.status_mut().managed_cluster = Some(observed.clone());
                    template
                })
                .await
            }
            None => Ok(()),
        }
    }

    /// Reject renames of a pinned template; pin the name if it never was
    async fn check_template_name(&mut self, template_name: &str) -> std::result::Result<(), Failure> {
        match self.instance.current_status().component_template_name {
            Some(pinned) if pinned != template_name => {
                let error = Error::TemplateNameMismatch {
                    pinned,
                    requested: template_name.to_string(),
                };
                Err(self
                    .fail(reasons::NAME_MISMATCH, TEMPLATE_NAME_CHANGED, error)
                    .await)
            }
            Some(_) => Ok(()),
            None if self.options.persist_status => {
                let name = template_name.to_string();
                self.pin(move |mut template| {
                    template.status_mut().component_template_name = Some(name.clone());
                    template
                })
                .await
            }
            None => Ok(()),
        }
    }

    /// Remove the remote template when the resource is deleted.
    ///
    /// Pre-existing templates, templates never checked, and clusters that
    /// are gone or going away are left alone. Errors are returned so the
    /// deletion is retried.
    #[instrument(skip(self), fields(name = %self.instance.name_any(), namespace = %self.namespace()))]
    pub async fn delete(&mut self) -> Result<()> {
        let status = self.instance.current_status();
        match status.existing_component_template {
            TemplateExistence::Unknown => return Ok(()),
            TemplateExistence::PreExisting => {
                info!("component template was pre-existing; not deleting");
                return Ok(());
            }
            TemplateExistence::Owned => {}
        }

        let namespace = self.namespace();
        let cluster = self
            .guard(
                self.services
                    .clusters
                    .resolve(&namespace, &self.instance.spec.opensearch_cluster.name),
            )
            .await?;
        let Some(cluster) = cluster.filter(|c| !c.is_being_deleted()) else {
            debug!("opensearch cluster is gone or being deleted, nothing to remove");
            return Ok(());
        };

        let session = self.guard(self.services.gateway.connect(&cluster)).await?;

        let template_name = status
            .component_template_name
            .unwrap_or_else(|| self.instance.template_name());

        if !self.guard(session.template_exists(&template_name)).await? {
            debug!(template = %template_name, "component template already deleted from opensearch");
            return Ok(());
        }

        let deleted = self.remove(&*session, &template_name).await;
        let outcome = if deleted.is_ok() { "success" } else { "failure" };
        metrics::TEMPLATE_DELETIONS
            .with_label_values(&[outcome, &namespace])
            .inc();
        deleted
    }

    async fn remove(&self, session: &dyn TemplateSession, template_name: &str) -> Result<()> {
        self.guard(session.delete_template(template_name)).await?;
        info!(template = %template_name, "component template deleted from opensearch");
        Ok(())
    }

    /// Emit the waiting event and hand the outcome back
    async fn wait(&self, outcome: Outcome) -> Outcome {
        if let Some(reason) = outcome.waiting_reason() {
            self.notify(EventType::Normal, reasons::OPENSEARCH_PENDING, reason.to_string())
                .await;
        }
        outcome
    }

    /// Emit a warning event and build the failure
    async fn fail(&self, reason_code: &str, reason: impl Into<String>, error: Error) -> Failure {
        let reason = reason.into();
        self.notify(EventType::Warning, reason_code, reason.clone())
            .await;
        Failure { reason, error }
    }

    /// Persist a pinned status field, failing the reconciliation on error
    async fn pin<F>(&mut self, mutate: F) -> std::result::Result<(), Failure>
    where
        F: Fn(OpensearchComponentTemplate) -> OpensearchComponentTemplate + Send + Sync,
    {
        match self.write_status(mutate).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let reason = format!("failed to update status: {}", e);
                Err(self.fail(reasons::STATUS_ERROR, reason, e).await)
            }
        }
    }

    async fn write_status<F>(&mut self, mutate: F) -> Result<()>
    where
        F: Fn(OpensearchComponentTemplate) -> OpensearchComponentTemplate + Send + Sync,
    {
        let namespace = self.namespace();
        let name = self.instance.name_any();
        let updated = self
            .guard(update_status(
                &*self.services.store,
                &namespace,
                &name,
                &self.options.status_retry,
                mutate,
            ))
            .await?;
        self.instance = updated;
        Ok(())
    }

    async fn notify(&self, type_: EventType, reason: &str, note: String) {
        self.services
            .events
            .publish(&self.instance, type_, reason, note)
            .await;
    }

    /// Run a collaborator call, aborting if the operation context is cancelled
    async fn guard<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = call => result,
        }
    }

    fn count_upsert(&self, outcome: &str) {
        metrics::TEMPLATE_UPSERTS
            .with_label_values(&[outcome, &self.namespace()])
            .inc();
    }

    fn namespace(&self) -> String {
        self.instance
            .namespace()
            .unwrap_or_else(|| "default".to_string())
    }
}
