//! CRD YAML Generator
//!
//! This binary generates the Kubernetes CRD manifest for the custom resource
//! owned by the opensearch-template-operator.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/all.yaml

use opensearch_template_operator::crd::generate_crds;

fn main() -> Result<(), serde_yaml::Error> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
