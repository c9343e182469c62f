//! Kubernetes-backed store

use crate::error::StoreError;
use crate::selector::label_selector;
use crate::store_trait::PodStore;
use crds::DemoPod;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// [`PodStore`] backed by the Kubernetes API server.
///
/// Holds only a `kube::Client`; a namespaced `Api` is built per call.
#[derive(Clone)]
pub struct KubePodStore {
    client: Client,
}

impl KubePodStore {
    /// Creates a store using the given client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn demo_pods(&self, namespace: &str) -> Api<DemoPod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubePodStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePodStore").finish_non_exhaustive()
    }
}

fn object_key<'a>(
    kind: &str,
    namespace: Option<&'a str>,
    name: Option<&'a str>,
) -> Result<(&'a str, &'a str), StoreError> {
    let namespace = namespace
        .ok_or_else(|| StoreError::InvalidObject(format!("{} missing namespace", kind)))?;
    let name = name.ok_or_else(|| StoreError::InvalidObject(format!("{} missing name", kind)))?;
    Ok((namespace, name))
}

#[async_trait::async_trait]
impl PodStore for KubePodStore {
    async fn get_demo_pod(&self, namespace: &str, name: &str) -> Result<DemoPod, StoreError> {
        self.demo_pods(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("DemoPod {}/{}", namespace, name)))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, StoreError> {
        let selector = label_selector(selector);
        debug!("Listing pods in {} with selector {}", namespace, selector);
        let lp = ListParams::default().labels(&selector);
        let list = self
            .pods(namespace)
            .list(&lp)
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("pods in {} ({})", namespace, selector)))?;
        Ok(list.items)
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, StoreError> {
        let namespace = pod
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| StoreError::InvalidObject("Pod missing namespace".to_string()))?;
        let what = format!(
            "Pod {}/{}",
            namespace,
            pod.metadata
                .name
                .as_deref()
                .or(pod.metadata.generate_name.as_deref())
                .unwrap_or("<unnamed>")
        );
        self.pods(namespace)
            .create(&PostParams::default(), pod)
            .await
            .map_err(|e| StoreError::from_kube(e, &what))
    }

    async fn delete_pod(&self, pod: &Pod) -> Result<(), StoreError> {
        let (namespace, name) = object_key(
            "Pod",
            pod.metadata.namespace.as_deref(),
            pod.metadata.name.as_deref(),
        )?;
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_kube(e, &format!("Pod {}/{}", namespace, name)))
    }

    async fn update_status(&self, demo_pod: &DemoPod) -> Result<DemoPod, StoreError> {
        let (namespace, name) = object_key(
            "DemoPod",
            demo_pod.metadata.namespace.as_deref(),
            demo_pod.metadata.name.as_deref(),
        )?;
        let status_patch = json!({
            "status": demo_pod.status
        });
        self.demo_pods(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("DemoPod {}/{} status", namespace, name)))
    }
}
