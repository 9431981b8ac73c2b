//! Kubernetes-backed implementations of the reconciler's collaborators

mod cluster;
mod events;
mod secrets;
mod status_store;
mod template_request;

pub use cluster::*;
pub use events::*;
pub use secrets::*;
pub use status_store::*;
pub use template_request::*;
