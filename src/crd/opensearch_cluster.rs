//! OpenSearchCluster resource (read-only view)
//!
//! The cluster resource is owned by another controller. Only the fields the
//! template reconciler reads are modelled; everything else is ignored on
//! deserialisation.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Phase reported by a cluster that accepts API traffic
pub const PHASE_RUNNING: &str = "RUNNING";

/// Default OpenSearch HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 9200;

/// OpenSearchCluster specification (subset)
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpenSearchCluster",
    plural = "opensearchclusters",
    singular = "opensearchcluster",
    namespaced,
    status = "OpenSearchClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchClusterSpec {
    /// General cluster settings
    #[serde(default)]
    pub general: GeneralSpec,

    /// Security settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySpec>,
}

/// General cluster settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSpec {
    /// Name of the Service fronting the cluster
    #[serde(default)]
    pub service_name: String,

    /// HTTP port of the Service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
}

/// Security settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SecurityConfigSpec>,
}

/// Security plugin configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfigSpec {
    /// Secret holding `username` and `password` of the admin user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_credentials_secret: Option<SecretReference>,
}

/// Reference to a Secret in the cluster's namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct SecretReference {
    #[serde(default)]
    pub name: String,
}

/// OpenSearchCluster status (subset)
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchClusterStatus {
    /// Cluster phase (PENDING, RUNNING, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl OpenSearchCluster {
    /// Stable identity of this cluster instance
    pub fn identity(&self) -> String {
        self.metadata.uid.clone().unwrap_or_default()
    }

    /// Whether the cluster reports its ready phase
    pub fn is_running(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|phase| phase == PHASE_RUNNING)
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn http_port(&self) -> u16 {
        self.spec.general.http_port.unwrap_or(DEFAULT_HTTP_PORT)
    }

    /// In-cluster HTTPS endpoint of the cluster's REST API
    pub fn service_url(&self, cluster_domain: &str) -> String {
        format!(
            "https://{}.{}.svc.{}:{}",
            self.spec.general.service_name,
            self.namespace().unwrap_or_else(|| "default".to_string()),
            cluster_domain,
            self.http_port()
        )
    }

    /// Admin credentials secret, when one is configured
    pub fn admin_credentials_secret(&self) -> Option<&str> {
        self.spec
            .security
            .as_ref()
            .and_then(|s| s.config.as_ref())
            .and_then(|c| c.admin_credentials_secret.as_ref())
            .map(|s| s.name.as_str())
            .filter(|name| !name.is_empty())
    }
}
