//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the reconciler and the watcher together, and runs the watcher
//! alongside the metrics and probe server.

use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{self, ServerState};
use crate::watcher::{Context, Watcher};
use crds::DemoPod;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use pod_store::KubePodStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for DemoPod resources.
#[derive(Debug)]
pub struct Controller {
    demo_pod_watcher: JoinHandle<Result<(), ControllerError>>,
    server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing DemoPod Controller");

        let kube_client = Client::try_default().await?;

        let (demo_pod_api, pod_api): (Api<DemoPod>, Api<Pod>) = match config.namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(kube_client.clone(), ns),
                Api::namespaced(kube_client.clone(), ns),
            ),
            None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
        };

        let store = Arc::new(KubePodStore::new(kube_client));
        let reconciler = Reconciler::new(store, config.store_timeout);
        let metrics = Arc::new(Metrics::new()?);

        let context = Arc::new(Context::new(
            reconciler,
            Arc::clone(&metrics),
            config.requeue_interval,
            config.backoff_min,
            config.backoff_max,
        ));

        let server_state = ServerState::new(metrics);
        let server = tokio::spawn(server::serve(config.metrics_addr, server_state.clone()));

        let watcher_instance = Watcher::new(context, demo_pod_api, pod_api, config.concurrency);
        let demo_pod_watcher = tokio::spawn(async move {
            watcher_instance.watch_demo_pods().await
        });
        server_state.set_ready(true);

        Ok(Self {
            demo_pod_watcher,
            server,
        })
    }

    /// Runs until the watcher stops or the server fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("DemoPod Controller running");

        tokio::select! {
            result = &mut self.demo_pod_watcher => {
                self.server.abort();
                result.map_err(|e| ControllerError::Watch(format!("DemoPod watcher panicked: {}", e)))??;
            }
            result = &mut self.server => {
                self.demo_pod_watcher.abort();
                result.map_err(|e| ControllerError::Server(format!("server task panicked: {}", e)))??;
            }
        }

        info!("DemoPod Controller stopped");
        Ok(())
    }
}
