//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration of the DemoPod Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Bind address of the metrics and probe server
    pub metrics_addr: SocketAddr,
    /// Delay before the follow-up pass after a successful pass
    pub requeue_interval: Duration,
    /// Deadline applied to every store call
    pub store_timeout: Duration,
    /// First retry delay after a failed pass
    pub backoff_min: Duration,
    /// Cap of the retry delay
    pub backoff_max: Duration,
    /// Maximum number of DemoPods reconciled at the same time
    pub concurrency: u16,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads the configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let metrics_addr = match lookup("METRICS_ADDR") {
            Some(addr) => addr.parse::<SocketAddr>().map_err(|e| {
                ControllerError::InvalidConfig(format!("METRICS_ADDR {:?}: {}", addr, e))
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let requeue_interval = seconds(&lookup, "REQUEUE_INTERVAL_SECS", 1)?;
        let store_timeout = seconds(&lookup, "STORE_TIMEOUT_SECS", 30)?;
        let backoff_min = seconds(&lookup, "BACKOFF_MIN_SECS", 1)?;
        let backoff_max = seconds(&lookup, "BACKOFF_MAX_SECS", 300)?;
        if backoff_min > backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MIN_SECS ({}) exceeds BACKOFF_MAX_SECS ({})",
                backoff_min.as_secs(),
                backoff_max.as_secs()
            )));
        }

        let concurrency = match lookup("RECONCILE_CONCURRENCY") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "RECONCILE_CONCURRENCY must be a positive integer, got {:?}",
                        value
                    ))
                })?,
            None => 3,
        };

        Ok(Self {
            namespace,
            metrics_addr,
            requeue_interval,
            store_timeout,
            backoff_min,
            backoff_max,
            concurrency,
        })
    }
}

/// Reads a positive number of seconds, falling back to `default` when unset.
fn seconds<F>(lookup: &F, var: &str, default: u64) -> Result<Duration, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(Duration::from_secs(default));
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be a positive number of seconds, got {:?}",
            var, value
        ))),
    }
}
