//! Controller-specific error types.
//!
//! `ReconcileError` covers a single reconciliation pass and carries the
//! requeue decision for each failure. `ControllerError` covers start-up and
//! the long-running tasks of the process.

use pod_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading the DemoPod failed for a reason other than NotFound
    #[error("Failed to get DemoPod {key}: {source}")]
    Fetch { key: String, source: StoreError },

    /// Listing the DemoPod's pods failed
    #[error("Failed to list pods for DemoPod {key}: {source}")]
    ListPods { key: String, source: StoreError },

    /// Writing the status subresource failed
    #[error("Failed to update status of DemoPod {key}: {source}")]
    UpdateStatus { key: String, source: StoreError },

    /// The DemoPod lacks the metadata needed for a controller owner reference
    #[error("Cannot build owner reference for DemoPod {0}: missing name or uid")]
    OwnerReference(String),

    /// Creating a pod failed
    #[error("Failed to create pod for DemoPod {key}: {source}")]
    CreatePod { key: String, source: StoreError },

    /// Deleting a pod failed
    #[error("Failed to delete pod {pod} of DemoPod {key}: {source}")]
    DeletePod {
        key: String,
        pod: String,
        source: StoreError,
    },

    /// A store call did not complete before the deadline
    #[error("{operation} for DemoPod {key} did not complete within {timeout:?}")]
    Cancelled {
        key: String,
        operation: &'static str,
        timeout: Duration,
    },

    /// The DemoPod is missing its name or namespace
    #[error("Invalid DemoPod: {0}")]
    InvalidObject(String),
}

impl ReconcileError {
    /// Whether the failed pass asks to be requeued.
    ///
    /// Only failures before any observation was made (reading the DemoPod,
    /// or a call cut off by the deadline) request a requeue.
    pub fn requeue(&self) -> bool {
        matches!(
            self,
            ReconcileError::Fetch { .. } | ReconcileError::Cancelled { .. }
        )
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Fetch { .. } => "fetch",
            ReconcileError::ListPods { .. } => "list_pods",
            ReconcileError::UpdateStatus { .. } => "update_status",
            ReconcileError::OwnerReference(_) => "owner_reference",
            ReconcileError::CreatePod { .. } => "create_pod",
            ReconcileError::DeletePod { .. } => "delete_pod",
            ReconcileError::Cancelled { .. } => "cancelled",
            ReconcileError::InvalidObject(_) => "invalid_object",
        }
    }
}

/// Errors that can occur in the DemoPod Controller process.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Metrics/probe server failed
    #[error("Server error: {0}")]
    Server(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable() -> StoreError {
        StoreError::Unavailable("api down".to_string())
    }

    #[test]
    fn test_requeue_decisions() {
        let key = "default/web".to_string();
        assert!(ReconcileError::Fetch { key: key.clone(), source: unavailable() }.requeue());
        assert!(ReconcileError::Cancelled {
            key: key.clone(),
            operation: "list pods",
            timeout: Duration::from_secs(1),
        }
        .requeue());

        assert!(!ReconcileError::ListPods { key: key.clone(), source: unavailable() }.requeue());
        assert!(!ReconcileError::UpdateStatus { key: key.clone(), source: unavailable() }.requeue());
        assert!(!ReconcileError::CreatePod { key: key.clone(), source: unavailable() }.requeue());
        assert!(!ReconcileError::DeletePod {
            key: key.clone(),
            pod: "web-pod00001".to_string(),
            source: unavailable(),
        }
        .requeue());
        assert!(!ReconcileError::OwnerReference(key.clone()).requeue());
        assert!(!ReconcileError::InvalidObject(key).requeue());
    }

    #[test]
    fn test_error_message_names_step_and_key() {
        let err = ReconcileError::ListPods {
            key: "default/web".to_string(),
            source: unavailable(),
        };
        let msg = err.to_string();
        assert!(msg.contains("list pods"));
        assert!(msg.contains("default/web"));
        assert!(msg.contains("api down"));
        assert_eq!(err.kind(), "list_pods");
    }
}
