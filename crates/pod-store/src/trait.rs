//! PodStore trait for mocking
//!
//! This trait abstracts cluster access so the reconciler can run against the
//! Kubernetes API in production and against an in-memory fake in unit tests.

use crate::error::StoreError;
use crds::DemoPod;
use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

/// Store operations the DemoPod reconciler depends on
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Cancellation is expressed by dropping the returned future.
#[async_trait::async_trait]
pub trait PodStore: Send + Sync {
    /// Fetches a DemoPod by key. Returns [`StoreError::NotFound`] if it does not exist.
    async fn get_demo_pod(&self, namespace: &str, name: &str) -> Result<DemoPod, StoreError>;

    /// Lists pods in `namespace` carrying every label in `selector`, in store order.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, StoreError>;

    /// Creates a pod. The pod's namespace is taken from its metadata.
    async fn create_pod(&self, pod: &Pod) -> Result<Pod, StoreError>;

    /// Deletes a pod identified by its metadata namespace and name.
    async fn delete_pod(&self, pod: &Pod) -> Result<(), StoreError>;

    /// Writes the status subresource of a DemoPod, leaving its spec untouched.
    async fn update_status(&self, demo_pod: &DemoPod) -> Result<DemoPod, StoreError>;
}
