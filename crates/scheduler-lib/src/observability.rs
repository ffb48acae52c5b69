//! Observability infrastructure for the namespace scheduler
//!
//! Provides:
//! - Prometheus metrics (scale operations, workload transitions, batch pauses,
//!   state cache efficiency, namespace allocation gauges)
//! - Structured JSON logging of scheduler lifecycle events with tracing

use crate::models::{NamespaceState, ScaleReport, TransitionOutcome, WorkloadKind};
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter, register_int_counter_vec,
    GaugeVec, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for whole up/down operations (in seconds). Batched
/// scale-ups routinely take minutes.
const OPERATION_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SchedulerMetricsInner> = OnceLock::new();

struct SchedulerMetricsInner {
    scale_operations: IntCounterVec,
    scale_operation_duration_seconds: HistogramVec,
    workloads_transitioned: IntCounterVec,
    workload_patch_failures: IntCounterVec,
    batch_pauses: IntCounter,
    state_cache_hits: IntCounter,
    state_cache_misses: IntCounter,
    namespace_pods: GaugeVec,
    namespace_cpu_cores: GaugeVec,
    namespace_memory_bytes: GaugeVec,
}

impl SchedulerMetricsInner {
    fn new() -> Self {
        Self {
            scale_operations: register_int_counter_vec!(
                "ns_scheduler_scale_operations_total",
                "Number of up/down operations started",
                &["action"]
            )
            .expect("Failed to register scale_operations_total"),

            scale_operation_duration_seconds: register_histogram_vec!(
                "ns_scheduler_scale_operation_duration_seconds",
                "Wall time of up/down operations, including batch pauses",
                &["action"],
                OPERATION_BUCKETS.to_vec()
            )
            .expect("Failed to register scale_operation_duration_seconds"),

            workloads_transitioned: register_int_counter_vec!(
                "ns_scheduler_workloads_transitioned_total",
                "Workloads routed through the transition engine",
                &["action", "kind", "result"]
            )
            .expect("Failed to register workloads_transitioned_total"),

            workload_patch_failures: register_int_counter_vec!(
                "ns_scheduler_workload_patch_failures_total",
                "Workload patches rejected by the cluster API",
                &["kind"]
            )
            .expect("Failed to register workload_patch_failures_total"),

            batch_pauses: register_int_counter!(
                "ns_scheduler_batch_pauses_total",
                "Pauses inserted between scale-up batches"
            )
            .expect("Failed to register batch_pauses_total"),

            state_cache_hits: register_int_counter!(
                "ns_scheduler_state_cache_hits_total",
                "Namespace state requests served from cache"
            )
            .expect("Failed to register state_cache_hits_total"),

            state_cache_misses: register_int_counter!(
                "ns_scheduler_state_cache_misses_total",
                "Namespace state requests that listed workloads"
            )
            .expect("Failed to register state_cache_misses_total"),

            namespace_pods: register_gauge_vec!(
                "ns_scheduler_namespace_pods",
                "Desired replicas across Deployments and StatefulSets",
                &["namespace"]
            )
            .expect("Failed to register namespace_pods"),

            namespace_cpu_cores: register_gauge_vec!(
                "ns_scheduler_namespace_cpu_cores",
                "Requested CPU across all replicas, in cores",
                &["namespace"]
            )
            .expect("Failed to register namespace_cpu_cores"),

            namespace_memory_bytes: register_gauge_vec!(
                "ns_scheduler_namespace_memory_bytes",
                "Requested memory across all replicas, in bytes",
                &["namespace"]
            )
            .expect("Failed to register namespace_memory_bytes"),
        }
    }
}

/// Scheduler metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SchedulerMetrics {
    _private: (),
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SchedulerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SchedulerMetricsInner {
        GLOBAL_METRICS.get_or_init(SchedulerMetricsInner::new)
    }

    /// Count a started operation
    pub fn inc_scale_operations(&self, action: &str) {
        self.inner()
            .scale_operations
            .with_label_values(&[action])
            .inc();
    }

    pub fn observe_scale_duration(&self, action: &str, duration_secs: f64) {
        self.inner()
            .scale_operation_duration_seconds
            .with_label_values(&[action])
            .observe(duration_secs);
    }

    /// Count one workload outcome
    pub fn record_transition(&self, action: &str, kind: WorkloadKind, outcome: &TransitionOutcome) {
        let result = match outcome {
            TransitionOutcome::Intact { .. } => "intact",
            TransitionOutcome::Scaled { .. } => "scaled",
            TransitionOutcome::Failed { .. } => "failed",
        };
        let kind = kind.to_string();

        self.inner()
            .workloads_transitioned
            .with_label_values(&[action, &kind, result])
            .inc();

        if matches!(outcome, TransitionOutcome::Failed { .. }) {
            self.inner()
                .workload_patch_failures
                .with_label_values(&[&kind])
                .inc();
        }
    }

    pub fn inc_batch_pauses(&self) {
        self.inner().batch_pauses.inc();
    }

    pub fn inc_state_cache_hits(&self) {
        self.inner().state_cache_hits.inc();
    }

    pub fn inc_state_cache_misses(&self) {
        self.inner().state_cache_misses.inc();
    }

    /// Publish the latest computed state of a namespace
    pub fn set_namespace_state(&self, namespace: &str, state: &NamespaceState) {
        let inner = self.inner();
        inner
            .namespace_pods
            .with_label_values(&[namespace])
            .set(state.pods as f64);
        inner
            .namespace_cpu_cores
            .with_label_values(&[namespace])
            .set(state.cpu);
        inner
            .namespace_memory_bytes
            .with_label_values(&[namespace])
            .set(state.memory);
    }
}

/// Structured logger for scheduler events
///
/// Provides consistent JSON-formatted logging for lifecycle and operation
/// summaries, keyed by the scheduler instance name.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log scheduler startup
    pub fn log_startup(&self, version: &str, cluster_target: &str) {
        info!(
            event = "scheduler_started",
            instance = %self.instance,
            version = %version,
            cluster = %cluster_target,
            "Namespace scheduler started"
        );
    }

    /// Log scheduler shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "scheduler_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Namespace scheduler shutting down"
        );
    }

    /// Log the summary of a finished up/down operation
    pub fn log_scale_completed(&self, report: &ScaleReport, elapsed_secs: f64) {
        if report.failed > 0 {
            warn!(
                event = "scale_completed",
                instance = %self.instance,
                action = %report.action,
                namespaces = ?report.namespaces,
                scaled = report.scaled,
                intact = report.intact,
                failed = report.failed,
                pauses = report.pauses,
                elapsed_secs = elapsed_secs,
                "Scale operation finished with failures"
            );
        } else {
            info!(
                event = "scale_completed",
                instance = %self.instance,
                action = %report.action,
                namespaces = ?report.namespaces,
                scaled = report.scaled,
                intact = report.intact,
                pauses = report.pauses,
                elapsed_secs = elapsed_secs,
                "Scale operation finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScaleAction;

    #[test]
    fn test_scheduler_metrics_creation() {
        let metrics = SchedulerMetrics::new();

        metrics.inc_scale_operations("up");
        metrics.observe_scale_duration("up", 0.2);
        metrics.record_transition(
            "down",
            WorkloadKind::Deployment,
            &TransitionOutcome::Failed {
                error: "forbidden".to_string(),
            },
        );
        metrics.inc_batch_pauses();
        metrics.inc_state_cache_hits();
        metrics.inc_state_cache_misses();
        metrics.set_namespace_state(
            "team-a",
            &NamespaceState {
                pods: 3,
                cpu: 1.5,
                memory: 805_306_368.0,
            },
        );

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "ns_scheduler_workload_patch_failures_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");

        let report = ScaleReport::new(ScaleAction::Up, vec!["team-a".to_string()]);
        logger.log_scale_completed(&report, 0.1);
    }
}
