//! Prometheus metrics for the OpenSearch Template Operator
//!
//! This module exposes metrics for monitoring operator health and performance.

mod prometheus;

pub use prometheus::*;
