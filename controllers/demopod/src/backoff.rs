//! # Fibonacci Backoff
//!
//! Retry delays for DemoPods whose reconciliation keeps failing.
//! The delay grows more slowly than exponential backoff, so a store that is
//! briefly unavailable is retried soon while a persistent failure settles at
//! the cap instead of hammering the API server.
//!
//! Sequence with a 1s minimum and 300s cap: 1s, 1s, 2s, 3s, 5s, 8s, 13s, ... 300s.

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max`.
/// Calculations are done in whole seconds.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay in seconds (first two values, and the value after reset)
    min_secs: u64,
    /// Previous delay in seconds
    prev_secs: u64,
    /// Next delay to hand out, in seconds
    current_secs: u64,
    /// Maximum delay in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new backoff starting at `min` and capped at `max`
    ///
    /// Sub-second parts are ignored; a zero minimum is raised to one second.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_secs = min.as_secs().max(1);
        let max_secs = max.as_secs().max(min_secs);
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_secs;

        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);

        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}
