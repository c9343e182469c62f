//! Prometheus metrics for DemoPod reconciliation.

use crate::error::ReconcileError;
use crate::reconciler::{DemoPodKey, Outcome, ScaleAction};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Reconciliation metrics and the registry they are exported from.
pub struct Metrics {
    registry: Registry,

    /// Passes by result (`requeue`, `done`, `error`)
    reconciliations_total: IntCounterVec,

    /// Failed passes by error kind
    reconcile_errors_total: IntCounterVec,

    /// Pods created or deleted
    pod_actions_total: IntCounterVec,

    /// Status subresource writes
    status_updates_total: IntCounter,

    /// Pass duration
    reconcile_duration_seconds: Histogram,

    /// Live pods per DemoPod, as observed by the last pass
    live_pods: IntGaugeVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create and register all metrics in a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations_total = IntCounterVec::new(
            Opts::new("demopod_reconciliations_total", "DemoPod reconciliation passes"),
            &["result"],
        )?;
        registry.register(Box::new(reconciliations_total.clone()))?;

        let reconcile_errors_total = IntCounterVec::new(
            Opts::new("demopod_reconcile_errors_total", "Failed DemoPod reconciliation passes"),
            &["kind"],
        )?;
        registry.register(Box::new(reconcile_errors_total.clone()))?;

        let pod_actions_total = IntCounterVec::new(
            Opts::new("demopod_pod_actions_total", "Pods created or deleted by the controller"),
            &["action"],
        )?;
        registry.register(Box::new(pod_actions_total.clone()))?;

        let status_updates_total = IntCounter::new(
            "demopod_status_updates_total",
            "DemoPod status subresource writes",
        )?;
        registry.register(Box::new(status_updates_total.clone()))?;

        let reconcile_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "demopod_reconcile_duration_seconds",
                "Duration of DemoPod reconciliation passes",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0]),
        )?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;

        let live_pods = IntGaugeVec::new(
            Opts::new("demopod_live_pods", "Live pods observed per DemoPod"),
            &["namespace", "name"],
        )?;
        registry.register(Box::new(live_pods.clone()))?;

        Ok(Self {
            registry,
            reconciliations_total,
            reconcile_errors_total,
            pod_actions_total,
            status_updates_total,
            reconcile_duration_seconds,
            live_pods,
        })
    }

    /// Record a pass that ended without error
    pub fn record_outcome(&self, key: &DemoPodKey, outcome: &Outcome, elapsed: Duration) {
        self.reconcile_duration_seconds.observe(elapsed.as_secs_f64());

        if !outcome.requeue {
            // DemoPod is gone; stop exporting its gauge
            self.reconciliations_total.with_label_values(&["done"]).inc();
            let _ = self
                .live_pods
                .remove_label_values(&[key.namespace.as_str(), key.name.as_str()]);
            return;
        }

        self.reconciliations_total.with_label_values(&["requeue"]).inc();
        self.live_pods
            .with_label_values(&[key.namespace.as_str(), key.name.as_str()])
            .set(i64::try_from(outcome.live_pods).unwrap_or(i64::MAX));
        if outcome.status_updated {
            self.status_updates_total.inc();
        }
        match outcome.action {
            ScaleAction::Created(_) => self.pod_actions_total.with_label_values(&["create"]).inc(),
            ScaleAction::Deleted(_) => self.pod_actions_total.with_label_values(&["delete"]).inc(),
            ScaleAction::None => {}
        }
    }

    /// Record a failed pass
    pub fn record_error(&self, error: &ReconcileError, elapsed: Duration) {
        self.reconcile_duration_seconds.observe(elapsed.as_secs_f64());
        self.reconciliations_total.with_label_values(&["error"]).inc();
        self.reconcile_errors_total
            .with_label_values(&[error.kind()])
            .inc();
    }

    /// Export all metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
