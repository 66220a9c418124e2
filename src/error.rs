//! Error types for the harness.
//!
//! Library code returns [`Result`] and propagates with `?`. Only the sink layer
//! turns an error into a test failure.

use thiserror::Error;

use crate::controlplane::ApiError;

/// Error type for harness operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error on the target cluster
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Control Plane REST error (carries the raw response body)
    #[error(transparent)]
    ControlPlane(#[from] ApiError),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No catalog image matches a short deployment spec
    #[error("no image found for {data_service} {tag}{build}")]
    ImageNotFound {
        data_service: String,
        tag: String,
        build: String,
    },

    /// More than one catalog image matches a short deployment spec
    #[error("{count} images match {data_service} {tag}; specify a build")]
    AmbiguousImage {
        data_service: String,
        tag: String,
        count: usize,
    },

    /// No template with the given name exists for the data service
    #[error("{kind} template {name:?} not found")]
    TemplateNotFound { kind: &'static str, name: String },

    /// Template names are expected to be unique within a tenant
    #[error("{count} {kind} templates named {name:?}")]
    AmbiguousTemplate {
        kind: &'static str,
        name: String,
        count: usize,
    },

    /// Missing required field in a resource or response
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Prometheus returned something other than an instant vector
    #[error("unexpected Prometheus result type {0:?}, expected vector")]
    UnexpectedResultType(String),

    /// Prometheus reported a query error
    #[error("Prometheus query failed: {0}")]
    Query(String),

    /// Data service name not present in the per-service tables
    #[error("unknown data service {0:?}")]
    UnknownDataService(String),

    /// Token acquisition failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error outside the Control Plane wrapper
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Check if this error indicates a not-found condition on either plane
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(e)) => e.code == 404,
            Error::ControlPlane(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict on either plane
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(e)) => e.code == 409,
            Error::ControlPlane(e) => e.is_conflict(),
            _ => false,
        }
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;
