//! Worker pod construction.

use crds::DemoPod;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

/// Container name and image of every worker pod.
pub const WORKER_IMAGE: &str = "busybox";

/// Command run by every worker pod.
pub const WORKER_COMMAND: [&str; 2] = ["sleep", "36000000"];

/// Builds the pod a DemoPod asks for.
///
/// The pod gets a generated name (`<name>-pod` plus a suffix chosen by the
/// API server) so concurrent creates never collide, and the `app` label that
/// links it back to the DemoPod. The owner reference is not set here.
pub fn build_pod(demo_pod: &DemoPod) -> Pod {
    Pod {
        metadata: ObjectMeta {
            generate_name: Some(format!("{}-pod", demo_pod.name_any())),
            namespace: demo_pod.namespace(),
            labels: Some(demo_pod.selector_labels()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: WORKER_IMAGE.to_string(),
                image: Some(WORKER_IMAGE.to_string()),
                command: Some(WORKER_COMMAND.iter().map(|s| (*s).to_string()).collect()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}
