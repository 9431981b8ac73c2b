//! Operator configuration loaded from the environment

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Requeue used while waiting on the owning cluster
pub const DEFAULT_PENDING_REQUEUE: Duration = Duration::from_secs(10);

/// Steady-state poll interval for templates that are in sync
pub const DEFAULT_SYNC_REQUEUE: Duration = Duration::from_secs(30);

/// Requeue applied by the error policy to transient failures
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Requeue applied to failures only a user edit can fix
pub const TERMINAL_ERROR_REQUEUE: Duration = Duration::from_secs(300);

/// Runtime configuration for the operator
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Port for the metrics and health server
    pub metrics_port: u16,
    /// Restrict the controller to one namespace (all namespaces when unset)
    pub watch_namespace: Option<String>,
    /// DNS suffix used to build in-cluster OpenSearch service URLs
    pub cluster_domain: String,
    /// Requeue while the owning cluster is missing or not running
    pub pending_requeue: Duration,
    /// Requeue once a template is in sync
    pub sync_requeue: Duration,
    /// Requeue for transient errors
    pub error_requeue: Duration,
    /// Timeout for individual OpenSearch requests
    pub request_timeout: Duration,
    /// Accept self-signed certificates on the OpenSearch HTTP layer.
    /// Defaults to true: clusters serve the operator-generated self-signed
    /// certificate, set `OPENSEARCH_SKIP_TLS_VERIFY=false` to verify.
    pub skip_tls_verify: bool,
    /// Reporter instance attached to emitted events
    pub pod_name: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            watch_namespace: None,
            cluster_domain: "cluster.local".to_string(),
            pending_requeue: DEFAULT_PENDING_REQUEUE,
            sync_requeue: DEFAULT_SYNC_REQUEUE,
            error_requeue: DEFAULT_ERROR_REQUEUE,
            request_timeout: Duration::from_secs(30),
            skip_tls_verify: true,
            pod_name: None,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            metrics_port: parse_or(&non_empty, "METRICS_PORT", defaults.metrics_port)?,
            watch_namespace: non_empty("WATCH_NAMESPACE"),
            cluster_domain: non_empty("CLUSTER_DOMAIN").unwrap_or(defaults.cluster_domain),
            pending_requeue: secs_or(&non_empty, "PENDING_REQUEUE_SECS", defaults.pending_requeue)?,
            sync_requeue: secs_or(&non_empty, "SYNC_REQUEUE_SECS", defaults.sync_requeue)?,
            error_requeue: secs_or(&non_empty, "ERROR_REQUEUE_SECS", defaults.error_requeue)?,
            request_timeout: secs_or(
                &non_empty,
                "OPENSEARCH_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout,
            )?,
            skip_tls_verify: parse_or(
                &non_empty,
                "OPENSEARCH_SKIP_TLS_VERIFY",
                defaults.skip_tls_verify,
            )?,
            pod_name: non_empty("POD_NAME"),
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("invalid value '{}' for {}: {}", raw, key, e))),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(Error::config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}
