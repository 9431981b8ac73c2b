//! Custom Resource Definitions for the OpenSearch Template Operator

mod component_template;
mod opensearch_cluster;

pub use component_template::*;
pub use opensearch_cluster::*;

use kube::CustomResourceExt;

/// Generate the YAML manifests of the CRDs this operator owns.
///
/// `OpenSearchCluster` is installed by the cluster operator and is not
/// included.
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![serde_yaml::to_string(
        &OpensearchComponentTemplate::crd(),
    )?])
}
