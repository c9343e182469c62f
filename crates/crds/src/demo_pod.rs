//! DemoPod CRD
//!
//! Declares how many worker pods should exist for a DemoPod and reports the
//! pods that currently count toward that number.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label key linking a worker pod to the DemoPod that owns it.
///
/// The label value is the DemoPod name.
pub const APP_LABEL: &str = "app";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "batch.jinphe.github.io",
    version = "v1alpha1",
    kind = "DemoPod",
    namespaced,
    status = "DemoPodStatus",
    shortname = "dp",
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Live","type":"integer","jsonPath":".status.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DemoPodSpec {
    /// Desired number of live pods
    #[serde(default)]
    pub replicas: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DemoPodStatus {
    /// Names of the pods counted as live (Pending or Running, not terminating)
    ///
    /// Always serialized, so a merge patch with no live pods clears the list.
    #[serde(default)]
    pub pod_names: Vec<String>,

    /// Number of live pods
    #[serde(default)]
    pub replicas: u32,
}

impl DemoPodStatus {
    /// Builds the status reported for the given live pod names.
    pub fn from_pod_names(pod_names: Vec<String>) -> Self {
        let replicas = u32::try_from(pod_names.len()).unwrap_or(u32::MAX);
        Self { pod_names, replicas }
    }

    /// Field-by-field comparison.
    ///
    /// Pod name order is significant: it is the order the store listed them.
    pub fn matches(&self, other: &DemoPodStatus) -> bool {
        self.replicas == other.replicas
            && self.pod_names.len() == other.pod_names.len()
            && self
                .pod_names
                .iter()
                .zip(other.pod_names.iter())
                .all(|(a, b)| a == b)
    }
}

impl DemoPod {
    /// Desired pod count as a `usize` for comparison with list lengths.
    pub fn desired_replicas(&self) -> usize {
        usize::try_from(self.spec.replicas).unwrap_or(usize::MAX)
    }

    /// Labels every owned pod carries, and the selector used to list them.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(APP_LABEL.to_string(), self.name_any())])
    }

    /// Whether the stored status already equals `status`.
    ///
    /// A DemoPod that has never had its status written compares as the
    /// empty status.
    pub fn status_matches(&self, status: &DemoPodStatus) -> bool {
        match &self.status {
            Some(current) => current.matches(status),
            None => DemoPodStatus::default().matches(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(names: &[&str]) -> DemoPodStatus {
        DemoPodStatus::from_pod_names(names.iter().map(|n| (*n).to_string()).collect())
    }

    #[test]
    fn test_from_pod_names_counts_names() {
        let s = status(&["a", "b", "c"]);
        assert_eq!(s.replicas, 3);
        assert_eq!(s.pod_names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_matches_same_names_same_order() {
        assert!(status(&["a", "b"]).matches(&status(&["a", "b"])));
    }

    #[test]
    fn test_matches_detects_order_change() {
        assert!(!status(&["a", "b"]).matches(&status(&["b", "a"])));
    }

    #[test]
    fn test_matches_detects_count_mismatch() {
        let mut s = status(&["a"]);
        s.replicas = 2;
        assert!(!s.matches(&status(&["a"])));
    }

    #[test]
    fn test_missing_status_matches_empty_status() {
        let dp = DemoPod::new("web", DemoPodSpec { replicas: 0 });
        assert!(dp.status_matches(&DemoPodStatus::default()));
        assert!(!dp.status_matches(&status(&["web-podx1"])));
    }

    #[test]
    fn test_selector_labels_use_name() {
        let dp = DemoPod::new("web", DemoPodSpec { replicas: 1 });
        let labels = dp.selector_labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get(APP_LABEL).map(String::as_str), Some("web"));
    }
}
