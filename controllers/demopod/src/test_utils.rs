//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::{DemoPodKey, Reconciler};
use crds::{DemoPod, DemoPodSpec, DemoPodStatus, APP_LABEL};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use pod_store::MockPodStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Helper to create a test DemoPod with a uid (needed for owner references)
pub fn create_test_demo_pod(namespace: &str, name: &str, replicas: u32) -> DemoPod {
    DemoPod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{}-{}", namespace, name)),
            ..Default::default()
        },
        spec: DemoPodSpec { replicas },
        status: None,
    }
}

/// Helper to create a test DemoPod whose stored status lists `pod_names`
pub fn create_test_demo_pod_with_status(
    namespace: &str,
    name: &str,
    replicas: u32,
    pod_names: &[&str],
) -> DemoPod {
    let mut demo_pod = create_test_demo_pod(namespace, name, replicas);
    demo_pod.status = Some(DemoPodStatus::from_pod_names(
        pod_names.iter().map(|n| (*n).to_string()).collect(),
    ));
    demo_pod
}

/// Helper to create a test pod labelled for DemoPod `app` in `phase`
pub fn create_test_pod(namespace: &str, name: &str, app: &str, phase: Option<&str>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(APP_LABEL.to_string(), app.to_string())])),
            ..Default::default()
        },
        spec: None,
        status: phase.map(|phase| PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

/// Helper to create a reconciler over `store` with a generous deadline
pub fn create_test_reconciler(store: &MockPodStore) -> Reconciler {
    Reconciler::new(Arc::new(store.clone()), Duration::from_secs(5))
}

/// Key of `namespace/name`
pub fn key(namespace: &str, name: &str) -> DemoPodKey {
    DemoPodKey::new(namespace, name)
}
