//! Reconciliation logic for DemoPod CRDs.
//!
//! Each pass re-reads the DemoPod and its pods, writes the status if it
//! changed, and makes at most one pod of progress toward `spec.replicas`.
//! Convergence comes from being requeued, not from batching work in a pass.

use crate::error::ReconcileError;
use crate::pod_builder::build_pod;
use crds::{DemoPod, DemoPodStatus};
use k8s_openapi::api::core::v1::Pod;
use kube::{Resource, ResourceExt};
use pod_store::{pod_phase, PodStore, StoreError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Pod phases that count toward a DemoPod's replicas.
const LIVE_PHASES: [&str; 2] = ["Pending", "Running"];

/// Namespace and name of a DemoPod.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DemoPodKey {
    pub namespace: String,
    pub name: String,
}

impl DemoPodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a DemoPod object, which must carry a namespace and name.
    pub fn from_object(demo_pod: &DemoPod) -> Result<Self, ReconcileError> {
        let name = demo_pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| ReconcileError::InvalidObject("DemoPod missing name".to_string()))?;
        let namespace = demo_pod.metadata.namespace.clone().ok_or_else(|| {
            ReconcileError::InvalidObject(format!("DemoPod {} missing namespace", name))
        })?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for DemoPodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Corrective action taken by a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleAction {
    /// A pod was created; holds the name the store assigned
    Created(String),
    /// A pod was deleted
    Deleted(String),
    None,
}

/// Result of a pass that ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the scheduler should invoke the pass again
    pub requeue: bool,
    pub live_pods: usize,
    pub desired_replicas: usize,
    pub status_updated: bool,
    pub action: ScaleAction,
}

impl Outcome {
    /// The DemoPod no longer exists.
    fn not_found() -> Self {
        Self {
            requeue: false,
            live_pods: 0,
            desired_replicas: 0,
            status_updated: false,
            action: ScaleAction::None,
        }
    }
}

/// Whether a pod counts toward its DemoPod's replicas.
///
/// Terminating pods never count; otherwise only Pending and Running do.
pub fn is_live(pod: &Pod) -> bool {
    pod.metadata.deletion_timestamp.is_none()
        && pod_phase(pod).is_some_and(|phase| LIVE_PHASES.contains(&phase))
}

/// Live pods of `pods`, keeping the store order.
pub fn live_pods(pods: &[Pod]) -> Vec<&Pod> {
    pods.iter().filter(|pod| is_live(pod)).collect()
}

/// Reconciles DemoPod resources against the pods they own.
pub struct Reconciler {
    store: Arc<dyn PodStore>,
    store_timeout: Duration,
}

impl Reconciler {
    /// Creates a reconciler using `store`; every store call is bounded by `store_timeout`.
    pub fn new(store: Arc<dyn PodStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Runs one store call under the deadline.
    async fn call<T, F>(
        &self,
        key: &DemoPodKey,
        operation: &'static str,
        call: F,
    ) -> Result<Result<T, StoreError>, ReconcileError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| {
                error!(
                    "{} for DemoPod {} timed out after {:?}",
                    operation, key, self.store_timeout
                );
                ReconcileError::Cancelled {
                    key: key.to_string(),
                    operation,
                    timeout: self.store_timeout,
                }
            })
    }

    /// Reconciles the DemoPod identified by `key`.
    ///
    /// This method:
    /// 1. Fetches the DemoPod (NotFound ends the pass without requeue)
    /// 2. Lists the pods labelled `app=<name>` in its namespace
    /// 3. Keeps the live ones (not terminating, Pending or Running)
    /// 4. Writes the status if it differs from the stored one
    /// 5. Creates one pod if too few are live, or deletes the first live pod
    ///    if too many are
    ///
    /// Every pass that gets through these steps asks to be requeued.
    pub async fn reconcile(&self, key: &DemoPodKey) -> Result<Outcome, ReconcileError> {
        info!("Reconciling DemoPod {}", key);

        let demo_pod = match self
            .call(key, "get DemoPod", self.store.get_demo_pod(&key.namespace, &key.name))
            .await?
        {
            Ok(demo_pod) => demo_pod,
            Err(StoreError::NotFound(_)) => {
                info!("DemoPod {} not found, owned pods are left to garbage collection", key);
                return Ok(Outcome::not_found());
            }
            Err(e) => {
                error!("Failed to get DemoPod {}: {}", key, e);
                return Err(ReconcileError::Fetch {
                    key: key.to_string(),
                    source: e,
                });
            }
        };

        let namespace = demo_pod.namespace().ok_or_else(|| {
            ReconcileError::InvalidObject(format!("DemoPod {} has no namespace", key))
        })?;

        let pods = self
            .call(
                key,
                "list pods",
                self.store.list_pods(&namespace, &demo_pod.selector_labels()),
            )
            .await?
            .map_err(|e| {
                error!("Failed to list pods for DemoPod {}: {}", key, e);
                ReconcileError::ListPods {
                    key: key.to_string(),
                    source: e,
                }
            })?;

        let live = live_pods(&pods);
        let live_names: Vec<String> = live.iter().map(|pod| pod.name_any()).collect();
        let desired = demo_pod.desired_replicas();

        let status = DemoPodStatus::from_pod_names(live_names.clone());
        let status_updated = !demo_pod.status_matches(&status);
        if status_updated {
            debug!(
                "Updating status of DemoPod {}: {} live pods {:?}",
                key, status.replicas, status.pod_names
            );
            let mut updated = demo_pod.clone();
            updated.status = Some(status);
            self.call(key, "update status", self.store.update_status(&updated))
                .await?
                .map_err(|e| {
                    error!("Failed to update status of DemoPod {}: {}", key, e);
                    ReconcileError::UpdateStatus {
                        key: key.to_string(),
                        source: e,
                    }
                })?;
        }

        let action = if live.len() < desired {
            info!(
                "Creating pod for DemoPod {}, live pods: {:?}, desired replicas: {}",
                key, live_names, desired
            );
            let mut pod = build_pod(&demo_pod);
            let owner = demo_pod.controller_owner_ref(&()).ok_or_else(|| {
                error!("Cannot set owner reference for DemoPod {}", key);
                ReconcileError::OwnerReference(key.to_string())
            })?;
            pod.metadata.owner_references = Some(vec![owner]);

            let created = self
                .call(key, "create pod", self.store.create_pod(&pod))
                .await?
                .map_err(|e| {
                    error!("Failed to create pod for DemoPod {}: {}", key, e);
                    ReconcileError::CreatePod {
                        key: key.to_string(),
                        source: e,
                    }
                })?;
            ScaleAction::Created(created.name_any())
        } else if live.len() > desired {
            info!(
                "Deleting pod for DemoPod {}, live pods: {:?}, desired replicas: {}",
                key, live_names, desired
            );
            // First live pod in store order; the store gives no stronger ordering
            let victim = live[0];
            let victim_name = victim.name_any();
            self.call(key, "delete pod", self.store.delete_pod(victim))
                .await?
                .map_err(|e| {
                    error!("Failed to delete pod {} of DemoPod {}: {}", victim_name, key, e);
                    ReconcileError::DeletePod {
                        key: key.to_string(),
                        pod: victim_name.clone(),
                        source: e,
                    }
                })?;
            ScaleAction::Deleted(victim_name)
        } else {
            debug!("DemoPod {} has {} live pods as desired", key, desired);
            ScaleAction::None
        };

        Ok(Outcome {
            requeue: true,
            live_pods: live.len(),
            desired_replicas: desired,
            status_updated,
            action,
        })
    }
}
