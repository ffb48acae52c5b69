//! Batch throttling of scale-up operations
//!
//! Waking a whole namespace at once can flood the control plane and the
//! nodes' image pulls. The throttler counts workloads scaled up per namespace
//! and inserts a pause after every batch.

use crate::observability::SchedulerMetrics;
use crate::shutdown::ShutdownSignal;
use dashmap::DashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Batch size and pause length for a scale-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Workloads per batch; 0 disables batching
    pub size: u32,
    /// Pause between batches; zero disables batching
    pub interval: Duration,
}

impl BatchPolicy {
    pub fn new(size: u32, interval: Duration) -> Self {
        Self { size, interval }
    }

    /// Scale everything without pausing
    pub fn unbatched() -> Self {
        Self::default()
    }

    pub fn is_batched(&self) -> bool {
        self.size > 0 && !self.interval.is_zero()
    }
}

/// What [`BatchThrottler::pace`] did before letting the caller continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOutcome {
    Proceed,
    Paused,
    /// Shutdown fired; the caller should stop scaling
    Cancelled,
}

/// Per-namespace batch counters
///
/// Counters live as long as the throttler and are only reset when a pause
/// fires, so consecutive scale-ups of the same namespace share a batch.
pub struct BatchThrottler {
    counters: DashMap<String, u64>,
    shutdown: ShutdownSignal,
    metrics: SchedulerMetrics,
}

impl BatchThrottler {
    pub fn new(shutdown: ShutdownSignal, metrics: SchedulerMetrics) -> Self {
        Self {
            counters: DashMap::new(),
            shutdown,
            metrics,
        }
    }

    /// Count one workload about to be scaled up in `namespace`, pausing for
    /// `policy.interval` when the batch is already full
    pub async fn pace(&self, namespace: &str, policy: BatchPolicy) -> ThrottleOutcome {
        let count = {
            let mut counter = self.counters.entry(namespace.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        if !policy.is_batched() || count <= u64::from(policy.size) {
            return ThrottleOutcome::Proceed;
        }

        info!(
            namespace = %namespace,
            interval_secs = policy.interval.as_secs_f64(),
            "Waiting before scaling up next workload"
        );
        self.metrics.inc_batch_pauses();

        tokio::select! {
            biased;
            _ = self.shutdown.wait() => {
                warn!(namespace = %namespace, "Batch pause interrupted by shutdown");
                return ThrottleOutcome::Cancelled;
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        self.counters.insert(namespace.to_string(), 1);
        ThrottleOutcome::Paused
    }

    /// Current counter value for `namespace`
    pub fn counter(&self, namespace: &str) -> u64 {
        self.counters.get(namespace).map(|c| *c).unwrap_or(0)
    }
}
