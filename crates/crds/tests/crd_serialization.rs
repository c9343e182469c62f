//! Serialization tests for the DemoPod CRD.

use crds::{DemoPod, DemoPodSpec, DemoPodStatus};
use kube::CustomResourceExt;
use serde_json::json;

#[test]
fn test_crd_metadata() {
    let crd = DemoPod::crd();
    assert_eq!(crd.spec.group, "batch.jinphe.github.io");
    assert_eq!(crd.spec.names.kind, "DemoPod");
    assert_eq!(crd.spec.names.plural, "demopods");
    assert_eq!(crd.spec.scope, "Namespaced");

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    let subresources = version.subresources.as_ref().expect("subresources");
    assert!(subresources.status.is_some(), "status subresource must be enabled");
}

#[test]
fn test_status_serializes_empty_pod_names() {
    let value = serde_json::to_value(DemoPodStatus::default()).unwrap();
    assert_eq!(value, json!({"podNames": [], "replicas": 0}));
}

#[test]
fn test_deserialize_manifest() {
    let dp: DemoPod = serde_json::from_value(json!({
        "apiVersion": "batch.jinphe.github.io/v1alpha1",
        "kind": "DemoPod",
        "metadata": {"name": "web", "namespace": "default"},
        "spec": {"replicas": 3},
        "status": {"podNames": ["web-podabcde"], "replicas": 1}
    }))
    .unwrap();

    assert_eq!(dp.spec.replicas, 3);
    assert_eq!(dp.desired_replicas(), 3);
    let status = dp.status.expect("status");
    assert_eq!(status.pod_names, vec!["web-podabcde"]);
    assert_eq!(status.replicas, 1);
}

#[test]
fn test_missing_replicas_defaults_to_zero() {
    let spec: DemoPodSpec = serde_json::from_value(json!({})).unwrap();
    assert_eq!(spec.replicas, 0);
}

#[test]
fn test_status_without_pod_names_deserializes_empty() {
    let status: DemoPodStatus = serde_json::from_value(json!({"replicas": 0})).unwrap();
    assert!(status.pod_names.is_empty());
    assert!(status.matches(&DemoPodStatus::default()));
}
