//! Label selector and pod field helpers

use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

/// Renders an equality-based label selector (`k1=v1,k2=v2`).
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether `labels` contains every key/value pair of `selector`.
///
/// An empty selector matches everything.
pub fn matches_labels(
    selector: &BTreeMap<String, String>,
    labels: Option<&BTreeMap<String, String>>,
) -> bool {
    selector.iter().all(|(k, v)| {
        labels
            .and_then(|labels| labels.get(k))
            .is_some_and(|value| value == v)
    })
}

/// Pod phase as reported in `status.phase`, if any.
pub fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_label_selector_single() {
        assert_eq!(label_selector(&labels(&[("app", "web")])), "app=web");
    }

    #[test]
    fn test_label_selector_sorted_pairs() {
        let selector = labels(&[("tier", "backend"), ("app", "web")]);
        assert_eq!(label_selector(&selector), "app=web,tier=backend");
    }

    #[test]
    fn test_matches_labels_subset() {
        let selector = labels(&[("app", "web")]);
        let pod_labels = labels(&[("app", "web"), ("extra", "x")]);
        assert!(matches_labels(&selector, Some(&pod_labels)));
    }

    #[test]
    fn test_matches_labels_wrong_value() {
        let selector = labels(&[("app", "web")]);
        let pod_labels = labels(&[("app", "web2")]);
        assert!(!matches_labels(&selector, Some(&pod_labels)));
    }

    #[test]
    fn test_matches_labels_no_labels() {
        assert!(!matches_labels(&labels(&[("app", "web")]), None));
        assert!(matches_labels(&BTreeMap::new(), None));
    }
}
