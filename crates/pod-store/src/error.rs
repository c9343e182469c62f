//! Store errors

use thiserror::Error;

/// Errors that can occur when reading or writing cluster objects
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because of a conflicting object (name taken, stale resourceVersion)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// API server unavailable or failing (5xx, injected failures in tests)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Object is missing fields required for the call (name, namespace)
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Any other Kubernetes client error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Classifies a kube client error for the object described by `what`.
    pub fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => {
                StoreError::NotFound(what.to_string())
            }
            kube::Error::Api(ref response) if response.code == 409 => {
                StoreError::Conflict(format!("{}: {}", what, response.message))
            }
            kube::Error::Api(ref response) if response.code >= 500 => {
                StoreError::Unavailable(format!("{}: {}", what, response.message))
            }
            other => StoreError::Kube(other),
        }
    }

    /// Returns true if the object was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
