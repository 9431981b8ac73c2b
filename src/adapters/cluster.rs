//! Cluster lookup and OpenSearch session construction

use async_trait::async_trait;
use kube::{Api, Client};
use tracing::debug;

use super::secrets::cluster_credentials;
use crate::crd::OpenSearchCluster;
use crate::error::Result;
use crate::opensearch::{ClientOptions, OpenSearchClient};
use crate::reconcilers::{ClusterResolver, TemplateGateway, TemplateSession};

/// Resolves `OpenSearchCluster` resources through the Kubernetes API
pub struct KubeClusterResolver {
    client: Client,
}

impl KubeClusterResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterResolver for KubeClusterResolver {
    async fn resolve(&self, namespace: &str, name: &str) -> Result<Option<OpenSearchCluster>> {
        let api: Api<OpenSearchCluster> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

/// Builds authenticated REST clients for in-cluster OpenSearch services
pub struct KubeTemplateGateway {
    client: Client,
    cluster_domain: String,
    options: ClientOptions,
}

impl KubeTemplateGateway {
    pub fn new(client: Client, cluster_domain: impl Into<String>, options: ClientOptions) -> Self {
        Self {
            client,
            cluster_domain: cluster_domain.into(),
            options,
        }
    }
}

#[async_trait]
impl TemplateGateway for KubeTemplateGateway {
    async fn connect(&self, cluster: &OpenSearchCluster) -> Result<Box<dyn TemplateSession>> {
        let credentials = cluster_credentials(&self.client, cluster).await?;
        let url = cluster.service_url(&self.cluster_domain);
        debug!(url = %url, username = %credentials.username, "Creating OpenSearch client");
        let session = OpenSearchClient::new(url, credentials, &self.options)?;
        Ok(Box::new(session))
    }
}
