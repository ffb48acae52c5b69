//! Namespace power scheduling
//!
//! [`NamespaceScheduler`] drives whole namespaces up or down: it resolves the
//! namespace patterns, lists workloads, and routes each one through the
//! transition engine, throttling scale-ups in batches.


use crate::cluster::ClusterClient;
use crate::error::{Result, SchedulerError};
use crate::models::{NamespaceState, ScaleAction, ScaleReport, Workload, WorkloadKind};
use crate::observability::{SchedulerMetrics, StructuredLogger};
use crate::resolver::{NamespaceGuard, NamespaceResolver};
use crate::shutdown::ShutdownSignal;
use crate::state::StateAggregator;
use crate::throttle::{BatchPolicy, BatchThrottler, ThrottleOutcome};
use crate::transition::TransitionEngine;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Scales the workloads of whole namespaces down to zero and back
///
/// Cheap to clone; clones share batch counters and the state cache.
#[derive(Clone)]
pub struct NamespaceScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    client: Arc<dyn ClusterClient>,
    resolver: NamespaceResolver,
    engine: TransitionEngine,
    throttler: BatchThrottler,
    aggregator: StateAggregator,
    metrics: SchedulerMetrics,
    logger: StructuredLogger,
}

impl NamespaceScheduler {
    /// Scheduler without a namespace guard that never observes shutdown
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        NamespaceSchedulerBuilder::new(client).build()
    }

    pub fn builder(client: Arc<dyn ClusterClient>) -> NamespaceSchedulerBuilder {
        NamespaceSchedulerBuilder::new(client)
    }

    /// Restore the workloads of every namespace matched by `patterns`.
    ///
    /// Namespaces are processed in resolution order; within a namespace
    /// StatefulSets come before Deployments. Every workload passes the batch
    /// throttler before its transition.
    pub async fn up<S: AsRef<str>>(&self, patterns: &[S], policy: BatchPolicy) -> Result<ScaleReport> {
        let start = self.begin(ScaleAction::Up, patterns);
        let namespaces = self.inner.resolver.resolve(patterns).await?;
        let mut report = ScaleReport::new(ScaleAction::Up, namespaces.clone());

        for namespace in &namespaces {
            let (deployments, stateful_sets) = self.list_namespace(namespace).await?;
            info!(namespace = %namespace, "Starting up namespace '{}'", namespace);

            for workload in stateful_sets.iter().chain(&deployments) {
                match self.inner.throttler.pace(namespace, policy).await {
                    ThrottleOutcome::Proceed => {}
                    ThrottleOutcome::Paused => report.pauses += 1,
                    ThrottleOutcome::Cancelled => return Err(SchedulerError::Cancelled),
                }
                let outcome = self.inner.engine.transition(ScaleAction::Up, workload).await;
                report.record(workload, outcome);
            }
        }

        self.finish(&report, start);
        Ok(report)
    }

    /// Scale every workload of the namespaces matched by `patterns` to zero.
    ///
    /// Namespaces are processed in reverse resolution order; within a
    /// namespace Deployments come before StatefulSets.
    pub async fn down<S: AsRef<str>>(&self, patterns: &[S]) -> Result<ScaleReport> {
        let start = self.begin(ScaleAction::Down, patterns);
        let mut namespaces = self.inner.resolver.resolve(patterns).await?;
        namespaces.reverse();
        let mut report = ScaleReport::new(ScaleAction::Down, namespaces.clone());

        for namespace in &namespaces {
            info!(namespace = %namespace, "Shut down namespace '{}'", namespace);
            let (deployments, stateful_sets) = self.list_namespace(namespace).await?;

            for workload in deployments.iter().chain(&stateful_sets) {
                let outcome = self.inner.engine.transition(ScaleAction::Down, workload).await;
                report.record(workload, outcome);
            }
        }

        self.finish(&report, start);
        Ok(report)
    }

    /// Current resource allocation of the namespaces matched by `patterns`
    pub async fn state<S: AsRef<str>>(
        &self,
        patterns: &[S],
    ) -> Result<BTreeMap<String, NamespaceState>> {
        debug!(namespaces = ?pattern_list(patterns), "Getting state of namespaces");
        self.inner.aggregator.get_state(patterns).await
    }

    /// Every namespace name in the cluster; used as a connectivity probe
    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.inner
            .client
            .list_namespaces()
            .await
            .map_err(SchedulerError::ListNamespaces)
    }

    fn begin<S: AsRef<str>>(&self, action: ScaleAction, patterns: &[S]) -> Instant {
        debug!(
            action = %action,
            namespaces = ?pattern_list(patterns),
            "Starting scale operation"
        );
        self.inner.metrics.inc_scale_operations(action.as_str());
        Instant::now()
    }

    fn finish(&self, report: &ScaleReport, start: Instant) {
        let elapsed = start.elapsed().as_secs_f64();
        self.inner
            .metrics
            .observe_scale_duration(report.action.as_str(), elapsed);
        self.inner.logger.log_scale_completed(report, elapsed);
    }

    async fn list_namespace(&self, namespace: &str) -> Result<(Vec<Workload>, Vec<Workload>)> {
        let deployments = self.list(WorkloadKind::Deployment, namespace).await?;
        let stateful_sets = self.list(WorkloadKind::StatefulSet, namespace).await?;
        Ok((deployments, stateful_sets))
    }

    async fn list(&self, kind: WorkloadKind, namespace: &str) -> Result<Vec<Workload>> {
        self.inner
            .client
            .list_workloads(kind, namespace)
            .await
            .map_err(|source| SchedulerError::ListWorkloads {
                kind,
                namespace: namespace.to_string(),
                source,
            })
    }
}

fn pattern_list<S: AsRef<str>>(patterns: &[S]) -> Vec<&str> {
    patterns.iter().map(|p| p.as_ref()).collect()
}

/// Builder for [`NamespaceScheduler`]
pub struct NamespaceSchedulerBuilder {
    client: Arc<dyn ClusterClient>,
    guard: NamespaceGuard,
    shutdown: ShutdownSignal,
    instance: String,
}

impl NamespaceSchedulerBuilder {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            client,
            guard: NamespaceGuard::Disabled,
            shutdown: ShutdownSignal::never(),
            instance: "ns-scheduler".to_string(),
        }
    }

    /// Filter resolved namespaces through `guard`
    pub fn guard(mut self, guard: NamespaceGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Abort batch pauses when `shutdown` fires
    pub fn shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Name used in structured log events
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn build(self) -> NamespaceScheduler {
        let metrics = SchedulerMetrics::new();
        let resolver = NamespaceResolver::new(self.client.clone()).with_guard(self.guard);

        NamespaceScheduler {
            inner: Arc::new(SchedulerInner {
                engine: TransitionEngine::new(self.client.clone(), metrics.clone()),
                throttler: BatchThrottler::new(self.shutdown, metrics.clone()),
                aggregator: StateAggregator::new(
                    self.client.clone(),
                    resolver.clone(),
                    metrics.clone(),
                ),
                resolver,
                client: self.client,
                logger: StructuredLogger::new(self.instance),
                metrics,
            }),
        }
    }
}
