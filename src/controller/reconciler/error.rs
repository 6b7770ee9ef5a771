//! # Reconciler Errors
//!
//! Errors surfaced to the controller runtime. Every variant is retried with
//! backoff by the error policy; outcomes that must not be retried are reported
//! on the request status instead of being returned.

use crate::provider::ClientBuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// The signing client could not be constructed
    #[error("failed to initialise vault client: {0}")]
    ClientInit(#[source] ClientBuildError),
    /// A Kubernetes API call failed
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    /// The status patch could not be serialized
    #[error("failed to serialize status: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The object is missing metadata the controller needs
    #[error("resource is missing {0}")]
    MissingMetadata(&'static str),
}
