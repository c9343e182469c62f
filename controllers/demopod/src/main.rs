//! DemoPod Controller
//!
//! Keeps the number of live worker pods of every DemoPod equal to its
//! `spec.replicas`, one create or delete per reconciliation pass, and
//! publishes the live pod names in the DemoPod status.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod pod_builder;
mod reconciler;
mod server;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting DemoPod Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Metrics address: {}", config.metrics_addr);
    info!("  Requeue interval: {:?}", config.requeue_interval);
    info!("  Store timeout: {:?}", config.store_timeout);
    info!("  Backoff: {:?} to {:?}", config.backoff_min, config.backoff_max);
    info!("  Concurrency: {}", config.concurrency);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
