//! OpenSearch Template Kubernetes Operator
//!
//! This operator keeps OpenSearch component templates in sync with
//! `OpensearchComponentTemplate` custom resources.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod opensearch;
pub mod reconcilers;

pub use error::{Error, Result};
