//! Integration tests for the Kubernetes-backed store
//!
//! These tests require a reachable cluster with the DemoPod CRD installed
//! (`cargo run -p crds --bin crdgen | kubectl apply -f -`).
//! Set TEST_NAMESPACE to choose the namespace (defaults to "default").

use crds::{DemoPod, DemoPodSpec, DemoPodStatus};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use pod_store::{KubePodStore, PodStore};
use std::collections::BTreeMap;

fn namespace() -> String {
    std::env::var("TEST_NAMESPACE").unwrap_or_else(|_| "default".to_string())
}

#[tokio::test]
#[ignore] // Requires running cluster
async fn test_get_missing_demo_pod_is_not_found() {
    let client = Client::try_default().await.expect("Failed to create client");
    let store = KubePodStore::new(client);

    let err = store
        .get_demo_pod(&namespace(), "pod-store-it-does-not-exist")
        .await
        .expect_err("DemoPod should not exist");
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

#[tokio::test]
#[ignore] // Requires running cluster
async fn test_list_pods_with_unmatched_selector() {
    let client = Client::try_default().await.expect("Failed to create client");
    let store = KubePodStore::new(client);

    let selector = BTreeMap::from([("app".to_string(), "pod-store-it-nothing".to_string())]);
    let pods = store
        .list_pods(&namespace(), &selector)
        .await
        .expect("Failed to list pods");
    assert!(pods.is_empty());
}

#[tokio::test]
#[ignore] // Requires running cluster and the DemoPod CRD
async fn test_status_update_round_trip() {
    let client = Client::try_default().await.expect("Failed to create client");
    let ns = namespace();
    let api: Api<DemoPod> = Api::namespaced(client.clone(), &ns);
    let store = KubePodStore::new(client);

    let name = "pod-store-it-status";
    let created = api
        .create(&PostParams::default(), &DemoPod::new(name, DemoPodSpec { replicas: 0 }))
        .await
        .expect("Failed to create DemoPod");

    let mut updated = created.clone();
    updated.status = Some(DemoPodStatus::from_pod_names(vec!["x".to_string()]));
    let stored = store.update_status(&updated).await.expect("Failed to update status");
    assert!(stored
        .status
        .expect("status")
        .matches(&DemoPodStatus::from_pod_names(vec!["x".to_string()])));

    api.delete(name, &DeleteParams::default())
        .await
        .expect("Failed to delete DemoPod");
}

#[tokio::test]
#[ignore] // Requires running cluster
async fn test_delete_missing_pod_is_not_found() {
    let client = Client::try_default().await.expect("Failed to create client");
    let store = KubePodStore::new(client);

    let mut pod = Pod::default();
    pod.metadata.name = Some("pod-store-it-missing-pod".to_string());
    pod.metadata.namespace = Some(namespace());
    let err = store.delete_pod(&pod).await.expect_err("pod should not exist");
    assert!(err.is_not_found());
}
