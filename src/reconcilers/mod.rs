//! Reconcilers for OpenSearch template CRDs
//!
//! This module contains the business logic for reconciling templates.
//! Reconcilers are responsible for:
//! - Guarding adoption and identity of the remote template
//! - Pushing the declared template when it drifts
//! - Removing owned templates on deletion
//! - Updating resource status

mod collaborators;
pub mod component_template;
pub mod outcome;
pub mod status;

pub use collaborators::*;
pub use component_template::{ComponentTemplateReconciler, ReconcilerOptions};
pub use outcome::{Intervals, Outcome, Requeue};
pub use status::{update_status, RetryConfig};
