//! OpensearchComponentTemplate controller
//!
//! Watches OpensearchComponentTemplate resources and triggers reconciliation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        finalizer::{finalizer, Error as FinalizerError, Event as FinalizerEvent},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument};

use crate::config::{OperatorConfig, TERMINAL_ERROR_REQUEUE};
use crate::controllers::Context;
use crate::crd::OpensearchComponentTemplate;
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::{ComponentTemplateReconciler, Requeue};

/// Finalizer name for OpensearchComponentTemplate resources
const FINALIZER_NAME: &str = "opensearch.opster.io/componenttemplate-finalizer";

/// Metrics label for this kind
const KIND: &str = "OpensearchComponentTemplate";

/// Run the OpensearchComponentTemplate controller
pub async fn run(client: Client, context: Arc<Context>) {
    let api: Api<OpensearchComponentTemplate> = match &context.config.watch_namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("OpensearchComponentTemplate CRD not installed: {}", e);
        return;
    }

    info!(
        namespace = context.config.watch_namespace.as_deref().unwrap_or("*"),
        "Starting OpensearchComponentTemplate controller"
    );

    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled OpensearchComponentTemplate"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                    metrics::RECONCILIATION_ERRORS.with_label_values(&[KIND]).inc();
                }
            }
        })
        .await;
}

/// Main reconciliation function
#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<OpensearchComponentTemplate>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<OpensearchComponentTemplate> = Api::namespaced(ctx.client.clone(), &namespace);

    // Use finalizer so owned templates are removed from OpenSearch
    finalizer(&api, FINALIZER_NAME, obj, |event| async {
        match event {
            FinalizerEvent::Apply(template) => apply(template, ctx.clone()).await,
            FinalizerEvent::Cleanup(template) => cleanup(template, ctx.clone()).await,
        }
    })
    .await
    .map_err(|e| Error::Finalizer(Box::new(e)))
}

/// Apply reconciliation (create/update)
async fn apply(template: Arc<OpensearchComponentTemplate>, ctx: Arc<Context>) -> Result<Action> {
    info!(
        name = %template.name_any(),
        generation = template.metadata.generation.unwrap_or(0),
        "Reconciling OpensearchComponentTemplate"
    );

    let mut reconciler = ComponentTemplateReconciler::new(
        &ctx.services,
        &ctx.options,
        ctx.shutdown.child_token(),
        (*template).clone(),
    );
    let requeue = reconciler.reconcile().await?;

    Ok(to_action(requeue))
}

/// Cleanup when resource is being deleted
async fn cleanup(template: Arc<OpensearchComponentTemplate>, ctx: Arc<Context>) -> Result<Action> {
    info!(name = %template.name_any(), "Cleaning up OpensearchComponentTemplate");

    let mut reconciler = ComponentTemplateReconciler::new(
        &ctx.services,
        &ctx.options,
        ctx.shutdown.child_token(),
        (*template).clone(),
    );
    reconciler.delete().await?;

    metrics::CLEANUPS.with_label_values(&[KIND]).inc();

    Ok(Action::await_change())
}

fn to_action(requeue: Requeue) -> Action {
    match requeue {
        Requeue::After(duration) => Action::requeue(duration),
        Requeue::AwaitChange => Action::await_change(),
    }
}

/// Error policy for the controller
fn error_policy(obj: Arc<OpensearchComponentTemplate>, error: &Error, ctx: Arc<Context>) -> Action {
    let requeue_duration = requeue_after(error, &ctx.config);
    error!(
        name = %obj.name_any(),
        error = %error,
        requeue_secs = requeue_duration.as_secs(),
        "Reconciliation failed, scheduling retry"
    );

    Action::requeue(requeue_duration)
}

/// Backoff for a failed reconciliation
pub fn requeue_after(error: &Error, config: &OperatorConfig) -> Duration {
    match error {
        Error::Finalizer(inner) => match inner.as_ref() {
            FinalizerError::ApplyFailed(e) | FinalizerError::CleanupFailed(e) => {
                requeue_after(e, config)
            }
            _ => config.error_requeue,
        },
        // The next steady-state poll retries the write
        Error::TemplateSync { .. } => config.sync_requeue,
        e if e.is_terminal() => TERMINAL_ERROR_REQUEUE,
        _ => config.error_requeue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OperatorConfig {
        OperatorConfig {
            error_requeue: Duration::from_secs(5),
            ..OperatorConfig::default()
        }
    }

    #[test]
    fn sync_failures_retry_on_the_poll_interval() {
        let error = Error::TemplateSync {
            name: "logs".to_string(),
            source: Box::new(Error::OpenSearchApi {
                status: 500,
                body: String::new(),
            }),
        };
        assert_eq!(requeue_after(&error, &config()), Duration::from_secs(30));
    }

    #[test]
    fn terminal_errors_back_off_longest() {
        let error = Error::TemplateNameMismatch {
            pinned: "logs".to_string(),
            requested: "logs-v2".to_string(),
        };
        assert_eq!(requeue_after(&error, &config()), TERMINAL_ERROR_REQUEUE);
    }

    #[test]
    fn finalizer_errors_are_unwrapped() {
        let error = Error::Finalizer(Box::new(FinalizerError::ApplyFailed(
            Error::ClusterRefMismatch {
                pinned: "a".to_string(),
                observed: "b".to_string(),
            },
        )));
        assert_eq!(requeue_after(&error, &config()), TERMINAL_ERROR_REQUEUE);

        let error = Error::Finalizer(Box::new(FinalizerError::CleanupFailed(Error::Cancelled)));
        assert_eq!(requeue_after(&error, &config()), Duration::from_secs(5));
    }

    #[test]
    fn requeue_directives_map_to_actions() {
        assert_eq!(
            to_action(Requeue::After(Duration::from_secs(10))),
            Action::requeue(Duration::from_secs(10))
        );
        assert_eq!(to_action(Requeue::AwaitChange), Action::await_change());
    }
}
