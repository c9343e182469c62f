//! Mock PodStore for unit testing
//!
//! This module provides an in-memory implementation of [`PodStore`] that
//! behaves like the API server closely enough for reconciler tests:
//!
//! - pods created with `generateName` get a unique name and a uid
//! - new pods start in the `Pending` phase
//! - removing a DemoPod garbage-collects the pods it controls
//!
//! Failures can be injected per operation and every call is counted.

use crate::error::StoreError;
use crate::selector::matches_labels;
use crate::store_trait::PodStore;
use crds::DemoPod;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Store operations, used to inject failures and read call counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetDemoPod,
    ListPods,
    CreatePod,
    DeletePod,
    UpdateStatus,
}

#[derive(Default)]
struct MockState {
    demo_pods: BTreeMap<(String, String), DemoPod>,
    // Insertion order is the list order
    pods: Vec<Pod>,
    failures: HashMap<MockOperation, String>,
    calls: HashMap<MockOperation, usize>,
    latency: Option<Duration>,
    next_id: u64,
}

/// In-memory [`PodStore`]
///
/// Cloning shares the underlying state, so a test can hand one clone to the
/// reconciler and inspect the other.
#[derive(Clone, Default)]
pub struct MockPodStore {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockPodStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MockPodStore")
            .field("demo_pods", &state.demo_pods.len())
            .field("pods", &state.pods.len())
            .finish_non_exhaustive()
    }
}

fn key_of(namespace: Option<&str>, name: Option<&str>) -> (String, String) {
    (
        namespace.unwrap_or_default().to_string(),
        name.unwrap_or_default().to_string(),
    )
}

fn pod_key(pod: &Pod) -> (String, String) {
    key_of(pod.metadata.namespace.as_deref(), pod.metadata.name.as_deref())
}

impl MockPodStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call, waits for the configured latency, and returns the
    /// injected failure for `op` if there is one.
    async fn enter(&self, op: MockOperation) -> Result<(), StoreError> {
        let latency = {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.state().failures.get(&op) {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    /// Add or replace a DemoPod (for test setup)
    pub fn add_demo_pod(&self, demo_pod: DemoPod) {
        let key = key_of(
            demo_pod.metadata.namespace.as_deref(),
            demo_pod.metadata.name.as_deref(),
        );
        self.state().demo_pods.insert(key, demo_pod);
    }

    /// Current stored copy of a DemoPod
    pub fn demo_pod(&self, namespace: &str, name: &str) -> Option<DemoPod> {
        self.state()
            .demo_pods
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Remove a DemoPod and garbage-collect the pods whose controller owner
    /// reference points at it
    pub fn remove_demo_pod(&self, namespace: &str, name: &str) -> Option<DemoPod> {
        let mut state = self.state();
        let removed = state
            .demo_pods
            .remove(&(namespace.to_string(), name.to_string()))?;
        if let Some(uid) = removed.metadata.uid.clone() {
            state.pods.retain(|pod| {
                !pod.metadata
                    .owner_references
                    .as_ref()
                    .is_some_and(|refs| refs.iter().any(|r| r.uid == uid))
            });
        }
        Some(removed)
    }

    /// Add a pod as-is (for test setup)
    pub fn add_pod(&self, pod: Pod) {
        self.state().pods.push(pod);
    }

    /// All stored pods, in list order
    pub fn pods(&self) -> Vec<Pod> {
        self.state().pods.clone()
    }

    /// Names of the stored pods in `namespace`, in list order
    pub fn pod_names(&self, namespace: &str) -> Vec<String> {
        self.state()
            .pods
            .iter()
            .filter(|p| p.metadata.namespace.as_deref() == Some(namespace))
            .filter_map(|p| p.metadata.name.clone())
            .collect()
    }

    /// Set `status.phase` of a stored pod. Returns false if the pod does not exist.
    pub fn set_pod_phase(&self, namespace: &str, name: &str, phase: &str) -> bool {
        let key = (namespace.to_string(), name.to_string());
        let mut state = self.state();
        match state.pods.iter_mut().find(|p| pod_key(p) == key) {
            Some(pod) => {
                pod.status.get_or_insert_with(PodStatus::default).phase = Some(phase.to_string());
                true
            }
            None => false,
        }
    }

    /// Set every stored pod in `namespace` to `phase`
    pub fn set_all_pod_phases(&self, namespace: &str, phase: &str) {
        for name in self.pod_names(namespace) {
            self.set_pod_phase(namespace, &name, phase);
        }
    }

    /// Mark a stored pod as terminating by setting its deletion timestamp
    pub fn mark_terminating(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let key = (namespace.to_string(), name.to_string());
        let mut state = self.state();
        let pod = state
            .pods
            .iter_mut()
            .find(|p| pod_key(p) == key)
            .ok_or_else(|| StoreError::NotFound(format!("Pod {}/{}", namespace, name)))?;
        let mut metadata = serde_json::to_value(&pod.metadata)?;
        metadata["deletionTimestamp"] = serde_json::Value::String("2024-01-01T00:00:00Z".to_string());
        pod.metadata = serde_json::from_value(metadata)?;
        Ok(())
    }

    /// Make every subsequent call of `op` fail with [`StoreError::Unavailable`]
    pub fn fail(&self, op: MockOperation, message: impl Into<String>) {
        self.state().failures.insert(op, message.into());
    }

    /// Stop failing `op`
    pub fn clear_failure(&self, op: MockOperation) {
        self.state().failures.remove(&op);
    }

    /// Delay every call by `latency` before it takes effect
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Number of times `op` was called, including failed calls
    pub fn calls(&self, op: MockOperation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of create, delete and status update calls
    pub fn mutation_calls(&self) -> usize {
        self.calls(MockOperation::CreatePod)
            + self.calls(MockOperation::DeletePod)
            + self.calls(MockOperation::UpdateStatus)
    }
}

#[async_trait::async_trait]
impl PodStore for MockPodStore {
    async fn get_demo_pod(&self, namespace: &str, name: &str) -> Result<DemoPod, StoreError> {
        self.enter(MockOperation::GetDemoPod).await?;
        self.demo_pod(namespace, name)
            .ok_or_else(|| StoreError::NotFound(format!("DemoPod {}/{}", namespace, name)))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, StoreError> {
        self.enter(MockOperation::ListPods).await?;
        Ok(self
            .state()
            .pods
            .iter()
            .filter(|p| p.metadata.namespace.as_deref() == Some(namespace))
            .filter(|p| matches_labels(selector, p.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, StoreError> {
        self.enter(MockOperation::CreatePod).await?;
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;

        let mut created = pod.clone();
        if created.metadata.namespace.is_none() {
            return Err(StoreError::InvalidObject("Pod missing namespace".to_string()));
        }
        if created.metadata.name.is_none() {
            let prefix = created.metadata.generate_name.clone().ok_or_else(|| {
                StoreError::InvalidObject("Pod needs name or generateName".to_string())
            })?;
            created.metadata.name = Some(format!("{}{:05}", prefix, id));
        }
        let key = pod_key(&created);
        if state.pods.iter().any(|p| pod_key(p) == key) {
            return Err(StoreError::Conflict(format!("Pod {}/{} already exists", key.0, key.1)));
        }
        created.metadata.uid = Some(format!("mock-uid-{}", id));
        created.status = Some(PodStatus {
            phase: Some("Pending".to_string()),
            ..Default::default()
        });
        state.pods.push(created.clone());
        Ok(created)
    }

    async fn delete_pod(&self, pod: &Pod) -> Result<(), StoreError> {
        self.enter(MockOperation::DeletePod).await?;
        let key = pod_key(pod);
        let mut state = self.state();
        let before = state.pods.len();
        state.pods.retain(|p| pod_key(p) != key);
        if state.pods.len() == before {
            return Err(StoreError::NotFound(format!("Pod {}/{}", key.0, key.1)));
        }
        Ok(())
    }

    async fn update_status(&self, demo_pod: &DemoPod) -> Result<DemoPod, StoreError> {
        self.enter(MockOperation::UpdateStatus).await?;
        let key = key_of(
            demo_pod.metadata.namespace.as_deref(),
            demo_pod.metadata.name.as_deref(),
        );
        let mut state = self.state();
        let stored = state
            .demo_pods
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("DemoPod {}/{}", key.0, key.1)))?;
        stored.status = demo_pod.status.clone();
        Ok(stored.clone())
    }
}
