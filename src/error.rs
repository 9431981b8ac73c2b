//! Error types for the OpenSearch Template Operator

use thiserror::Error;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Transport-level failure talking to OpenSearch
    #[error("OpenSearch HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// OpenSearch answered with an unexpected status code
    #[error("OpenSearch API returned {status}: {body}")]
    OpenSearchApi { status: u16, body: String },

    /// Optimistic concurrency conflict while writing status
    #[error("Conflict writing status: {0}")]
    Conflict(String),

    /// The owning cluster reference changed after adoption
    #[error("cannot change the cluster a component template refers to (pinned {pinned}, found {observed})")]
    ClusterRefMismatch { pinned: String, observed: String },

    /// The effective template name changed after it was pinned
    #[error("cannot change the component template name (pinned {pinned}, requested {requested})")]
    TemplateNameMismatch { pinned: String, requested: String },

    /// Template name OpenSearch would read as a pattern or list
    #[error("invalid component template name '{0}': must be non-empty and contain no '*' or ','")]
    InvalidTemplateName(String),

    /// Pushing the desired template to OpenSearch failed
    #[error("failed to sync component template '{name}': {source}")]
    TemplateSync {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// The operation context was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret not found
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// Secret key not found
    #[error("Secret key '{key}' not found in secret '{secret}'")]
    SecretKeyNotFound { secret: String, key: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Finalizer error
    #[error("Finalizer error: {0}")]
    Finalizer(#[source] Box<kube::runtime::finalizer::Error<Error>>),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Errors that only a user edit of the resource can clear
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::ClusterRefMismatch { .. }
                | Error::TemplateNameMismatch { .. }
                | Error::InvalidTemplateName(_)
        )
    }
}
