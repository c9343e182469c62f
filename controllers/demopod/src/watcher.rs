//! Kubernetes resource watchers.
//!
//! Watches DemoPods and the pods they own, and drives reconciliation with
//! `kube_runtime::Controller`. Events on owned pods are mapped back to the
//! owning DemoPod through their controller owner reference, so a pod that
//! finishes or is deleted re-triggers its DemoPod.

use crate::backoff::FibonacciBackoff;
use crate::error::{ControllerError, ReconcileError};
use crate::metrics::Metrics;
use crate::reconciler::{DemoPodKey, Reconciler};
use crds::DemoPod;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation.
pub struct Context {
    reconciler: Reconciler,
    metrics: Arc<Metrics>,
    /// Per-DemoPod retry state, keyed by `namespace/name`
    backoff: Mutex<HashMap<String, FibonacciBackoff>>,
    requeue_interval: Duration,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("requeue_interval", &self.requeue_interval)
            .field("backoff_min", &self.backoff_min)
            .field("backoff_max", &self.backoff_max)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(
        reconciler: Reconciler,
        metrics: Arc<Metrics>,
        requeue_interval: Duration,
        backoff_min: Duration,
        backoff_max: Duration,
    ) -> Self {
        Self {
            reconciler,
            metrics,
            backoff: Mutex::new(HashMap::new()),
            requeue_interval,
            backoff_min,
            backoff_max,
        }
    }

    fn backoff_states(&self) -> MutexGuard<'_, HashMap<String, FibonacciBackoff>> {
        // A panic while holding the lock leaves the map usable
        self.backoff.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Next retry delay for `key`, advancing its sequence.
    fn next_backoff(&self, key: &str) -> Duration {
        let (min, max) = (self.backoff_min, self.backoff_max);
        self.backoff_states()
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(min, max))
            .next_backoff()
    }

    fn reset_backoff(&self, key: &str) {
        if let Some(backoff) = self.backoff_states().get_mut(key) {
            backoff.reset();
        }
    }

    fn forget_backoff(&self, key: &str) {
        self.backoff_states().remove(key);
    }
}

/// `namespace/name` of an object as delivered by the watch, even if incomplete.
fn object_key(demo_pod: &DemoPod) -> String {
    format!(
        "{}/{}",
        demo_pod.namespace().unwrap_or_default(),
        demo_pod.name_any()
    )
}

/// Runs one pass for `demo_pod` and turns its outcome into the next action.
pub async fn reconcile(demo_pod: Arc<DemoPod>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let started = Instant::now();
    let result = match DemoPodKey::from_object(&demo_pod) {
        Ok(key) => ctx
            .reconciler
            .reconcile(&key)
            .await
            .map(|outcome| (key, outcome)),
        Err(e) => Err(e),
    };

    match result {
        Ok((key, outcome)) => {
            ctx.metrics.record_outcome(&key, &outcome, started.elapsed());
            debug!(
                "DemoPod {}: {}/{} live pods, action {:?}",
                key, outcome.live_pods, outcome.desired_replicas, outcome.action
            );
            let backoff_key = key.to_string();
            if outcome.requeue {
                ctx.reset_backoff(&backoff_key);
                Ok(Action::requeue(ctx.requeue_interval))
            } else {
                ctx.forget_backoff(&backoff_key);
                Ok(Action::await_change())
            }
        }
        Err(e) => {
            ctx.metrics.record_error(&e, started.elapsed());
            Err(e)
        }
    }
}

/// Decides when a DemoPod whose pass failed is retried.
pub fn error_policy(demo_pod: Arc<DemoPod>, error: &ReconcileError, ctx: Arc<Context>) -> Action {
    let key = object_key(&demo_pod);
    let delay = if error.requeue() {
        ctx.backoff_min
    } else {
        ctx.next_backoff(&key)
    };
    warn!("Reconciliation of DemoPod {} failed, retrying in {:?}: {}", key, delay, error);
    Action::requeue(delay)
}

/// Watches DemoPods and their pods.
pub struct Watcher {
    context: Arc<Context>,
    demo_pod_api: Api<DemoPod>,
    pod_api: Api<Pod>,
    concurrency: u16,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("context", &self.context)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        context: Arc<Context>,
        demo_pod_api: Api<DemoPod>,
        pod_api: Api<Pod>,
        concurrency: u16,
    ) -> Self {
        Self {
            context,
            demo_pod_api,
            pod_api,
            concurrency,
        }
    }

    /// Runs the controller until a termination signal arrives.
    ///
    /// The controller reconnects its watches on its own; stream errors are
    /// logged and do not end the loop.
    pub async fn watch_demo_pods(&self) -> Result<(), ControllerError> {
        info!("Starting DemoPod watcher (concurrency {})", self.concurrency);

        let controller_config = ControllerConfig::default().concurrency(self.concurrency);

        Controller::new(self.demo_pod_api.clone(), watcher::Config::default())
            .owns(self.pod_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, Arc::clone(&self.context))
            .for_each(|res| async move {
                match res {
                    Ok((obj, action)) => debug!("Reconciled DemoPod {}: {:?}", obj, action),
                    Err(e) => error!("DemoPod controller error: {}", e),
                }
            })
            .await;

        info!("DemoPod watcher stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_demo_pod, create_test_reconciler};
    use pod_store::{MockOperation, MockPodStore};

    fn create_test_context(store: &MockPodStore) -> Arc<Context> {
        Arc::new(Context::new(
            create_test_reconciler(store),
            Arc::new(Metrics::new().unwrap()),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(300),
        ))
    }

    #[tokio::test]
    async fn test_successful_pass_requeues_after_interval() {
        let store = MockPodStore::new();
        let demo_pod = create_test_demo_pod("default", "web", 1);
        store.add_demo_pod(demo_pod.clone());
        let ctx = create_test_context(&store);

        let action = reconcile(Arc::new(demo_pod), Arc::clone(&ctx)).await.unwrap();

        assert_eq!(action, Action::requeue(Duration::from_secs(1)));
        assert_eq!(store.pods().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_demo_pod_awaits_change() {
        let store = MockPodStore::new();
        let ctx = create_test_context(&store);

        let action = reconcile(Arc::new(create_test_demo_pod("default", "gone", 2)), ctx)
            .await
            .unwrap();

        assert_eq!(action, Action::await_change());
    }

    #[tokio::test]
    async fn test_object_without_namespace_is_rejected() {
        let store = MockPodStore::new();
        let ctx = create_test_context(&store);
        let mut demo_pod = create_test_demo_pod("default", "web", 1);
        demo_pod.metadata.namespace = None;

        let err = reconcile(Arc::new(demo_pod), ctx).await.unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidObject(_)));
        assert_eq!(store.calls(MockOperation::GetDemoPod), 0);
    }

    #[tokio::test]
    async fn test_failures_back_off_until_success() {
        let store = MockPodStore::new();
        let demo_pod = create_test_demo_pod("default", "web", 1);
        store.add_demo_pod(demo_pod.clone());
        store.fail(MockOperation::CreatePod, "quota exceeded");
        let ctx = create_test_context(&store);
        let obj = Arc::new(demo_pod);

        let mut delays = Vec::new();
        for _ in 0..4 {
            let err = reconcile(Arc::clone(&obj), Arc::clone(&ctx)).await.unwrap_err();
            assert!(!err.requeue());
            delays.push(error_policy(Arc::clone(&obj), &err, Arc::clone(&ctx)));
        }
        assert_eq!(
            delays,
            [1, 1, 2, 3].map(|s| Action::requeue(Duration::from_secs(s)))
        );

        // A successful pass restarts the sequence
        store.clear_failure(MockOperation::CreatePod);
        reconcile(Arc::clone(&obj), Arc::clone(&ctx)).await.unwrap();
        store.fail(MockOperation::ListPods, "api down");
        let err = reconcile(Arc::clone(&obj), Arc::clone(&ctx)).await.unwrap_err();
        assert_eq!(
            error_policy(obj, &err, ctx),
            Action::requeue(Duration::from_secs(1))
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_requeues_at_minimum() {
        let store = MockPodStore::new();
        let demo_pod = create_test_demo_pod("default", "web", 1);
        store.add_demo_pod(demo_pod.clone());
        store.fail(MockOperation::GetDemoPod, "api down");
        let ctx = create_test_context(&store);
        let obj = Arc::new(demo_pod);

        for _ in 0..3 {
            let err = reconcile(Arc::clone(&obj), Arc::clone(&ctx)).await.unwrap_err();
            assert!(err.requeue());
            assert_eq!(
                error_policy(Arc::clone(&obj), &err, Arc::clone(&ctx)),
                Action::requeue(Duration::from_secs(1))
            );
        }
    }
}
