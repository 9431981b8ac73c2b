//! Status persistence through the Kubernetes status subresource

use async_trait::async_trait;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};

use crate::crd::OpensearchComponentTemplate;
use crate::error::{Error, Result};
use crate::reconcilers::StatusStore;

/// Reads templates and replaces their status with optimistic concurrency
pub struct KubeStatusStore {
    client: Client,
}

impl KubeStatusStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<OpensearchComponentTemplate> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl StatusStore for KubeStatusStore {
    async fn get_latest(&self, namespace: &str, name: &str) -> Result<OpensearchComponentTemplate> {
        Ok(self.api(namespace).get(name).await?)
    }

    async fn replace_status(
        &self,
        template: &OpensearchComponentTemplate,
    ) -> Result<OpensearchComponentTemplate> {
        let namespace = template.namespace().unwrap_or_else(|| "default".to_string());
        // The body carries metadata.resourceVersion, so a stale copy is rejected with 409
        let data = serde_json::to_vec(template)?;
        self.api(&namespace)
            .replace_status(&template.name_any(), &PostParams::default(), data)
            .await
            .map_err(|e| match e {
                kube::Error::Api(api_err) if api_err.code == 409 => {
                    Error::Conflict(api_err.message)
                }
                other => Error::Kube(other),
            })
    }
}
