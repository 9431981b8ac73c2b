//! Status updates under optimistic concurrency
//!
//! Every write re-reads the latest persisted resource, applies the mutation
//! to that fresh copy and replaces the status. A conflicting concurrent
//! write restarts the whole read-modify-write after a short backoff.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use super::collaborators::StatusStore;
use crate::crd::OpensearchComponentTemplate;
use crate::error::{Error, Result};

/// Backoff for conflicting status writes
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
    /// Upper bound of the random extra delay, as a fraction of the delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
            jitter: 0.1,
        }
    }
}

/// Apply `mutate` to the latest copy of a template and persist its status.
///
/// `mutate` may run several times and must only depend on the object it is
/// given. Returns the persisted object.
pub async fn update_status<F>(
    store: &dyn StatusStore,
    namespace: &str,
    name: &str,
    retry: &RetryConfig,
    mutate: F,
) -> Result<OpensearchComponentTemplate>
where
    F: Fn(OpensearchComponentTemplate) -> OpensearchComponentTemplate + Send + Sync,
{
    let mut attempt = 0u32;
    let mut delay = retry.initial_delay;

    loop {
        attempt += 1;
        let latest = store.get_latest(namespace, name).await?;

        match store.replace_status(&mutate(latest)).await {
            Ok(updated) => return Ok(updated),
            Err(Error::Conflict(message)) if attempt < retry.max_attempts => {
                let jitter = rand::thread_rng().gen_range(0.0..=retry.jitter.max(0.0));
                let wait = delay.mul_f64(1.0 + jitter);
                debug!(
                    name = %name,
                    attempt = attempt,
                    delay_ms = wait.as_millis() as u64,
                    conflict = %message,
                    "Status update conflicted, retrying"
                );
                tokio::time::sleep(wait).await;
                delay = delay.mul_f64(retry.backoff_multiplier);
            }
            Err(e) => {
                if matches!(e, Error::Conflict(_)) {
                    warn!(name = %name, attempts = attempt, "Status update retries exhausted");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kube::api::ObjectMeta;

    use crate::crd::{ComponentTemplateSpec, TemplateExistence};

    /// Store that rejects the first `conflicts` writes
    struct ConflictingStore {
        stored: Mutex<OpensearchComponentTemplate>,
        conflicts: Mutex<u32>,
        reads: Mutex<u32>,
        writes: Mutex<u32>,
    }

    impl ConflictingStore {
        fn new(conflicts: u32) -> Self {
            Self {
                stored: Mutex::new(OpensearchComponentTemplate {
                    metadata: ObjectMeta {
                        name: Some("logs".to_string()),
                        namespace: Some("default".to_string()),
                        ..Default::default()
                    },
                    spec: ComponentTemplateSpec::default(),
                    status: None,
                }),
                conflicts: Mutex::new(conflicts),
                reads: Mutex::new(0),
                writes: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusStore for ConflictingStore {
        async fn get_latest(&self, _: &str, _: &str) -> Result<OpensearchComponentTemplate> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn replace_status(
            &self,
            template: &OpensearchComponentTemplate,
        ) -> Result<OpensearchComponentTemplate> {
            *self.writes.lock().unwrap() += 1;
            let mut conflicts = self.conflicts.lock().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(Error::Conflict("the object has been modified".to_string()));
            }
            *self.stored.lock().unwrap() = template.clone();
            Ok(template.clone())
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(1),
            ..RetryConfig::default()
        }
    }

    fn pin_owned(mut template: OpensearchComponentTemplate) -> OpensearchComponentTemplate {
        template.status_mut().existing_component_template = TemplateExistence::Owned;
        template
    }

    #[tokio::test]
    async fn writes_on_first_attempt() {
        let store = ConflictingStore::new(0);
        let updated = update_status(&store, "default", "logs", &fast_retry(), pin_owned)
            .await
            .unwrap();

        assert_eq!(
            updated.current_status().existing_component_template,
            TemplateExistence::Owned
        );
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn conflicts_refetch_and_retry() {
        let store = ConflictingStore::new(2);
        update_status(&store, "default", "logs", &fast_retry(), pin_owned)
            .await
            .unwrap();

        assert_eq!(*store.reads.lock().unwrap(), 3);
        assert_eq!(*store.writes.lock().unwrap(), 3);
        assert_eq!(
            store.stored.lock().unwrap().current_status().existing_component_template,
            TemplateExistence::Owned
        );
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_conflict() {
        let store = ConflictingStore::new(10);
        let err = update_status(&store, "default", "logs", &fast_retry(), pin_owned)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(*store.writes.lock().unwrap(), 5);
    }
}
