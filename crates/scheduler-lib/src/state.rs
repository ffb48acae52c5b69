//! Namespace resource state aggregation
//!
//! Sums desired replicas and requested CPU/memory over the Deployments and
//! StatefulSets of each namespace. Results are cached per namespace for
//! [`STATE_CACHE_TTL`] so dashboards polling several times a second do not
//! hammer the API server.

use crate::cluster::ClusterClient;
use crate::error::{Result, SchedulerError};
use crate::models::{NamespaceState, Workload, WorkloadKind};
use crate::observability::SchedulerMetrics;
use crate::quantity::parse_quantity;
use crate::resolver::NamespaceResolver;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How long a computed namespace state is served from cache
pub const STATE_CACHE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
struct CachedState {
    state: NamespaceState,
    computed_at: Instant,
}

/// Computes [`NamespaceState`] for namespace patterns
pub struct StateAggregator {
    client: Arc<dyn ClusterClient>,
    resolver: NamespaceResolver,
    cache: DashMap<String, CachedState>,
    metrics: SchedulerMetrics,
}

impl StateAggregator {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        resolver: NamespaceResolver,
        metrics: SchedulerMetrics,
    ) -> Self {
        Self {
            client,
            resolver,
            cache: DashMap::new(),
            metrics,
        }
    }

    /// State of every namespace matched by `patterns`, keyed by namespace
    pub async fn get_state<S: AsRef<str>>(
        &self,
        patterns: &[S],
    ) -> Result<BTreeMap<String, NamespaceState>> {
        let mut states = BTreeMap::new();

        for namespace in self.resolver.resolve(patterns).await? {
            if let Some(state) = self.cached(&namespace) {
                debug!(namespace = %namespace, "Getting cached state of namespace");
                self.metrics.inc_state_cache_hits();
                states.insert(namespace, state);
                continue;
            }

            self.metrics.inc_state_cache_misses();
            let state = self.compute(&namespace).await?;
            self.cache.insert(
                namespace.clone(),
                CachedState {
                    state,
                    computed_at: Instant::now(),
                },
            );
            self.metrics.set_namespace_state(&namespace, &state);
            states.insert(namespace, state);
        }

        info!(state = ?states, "Namespace state");
        Ok(states)
    }

    fn cached(&self, namespace: &str) -> Option<NamespaceState> {
        self.cache
            .get(namespace)
            .filter(|entry| entry.computed_at.elapsed() < STATE_CACHE_TTL)
            .map(|entry| entry.state)
    }

    async fn compute(&self, namespace: &str) -> Result<NamespaceState> {
        let mut state = NamespaceState::default();

        for kind in [WorkloadKind::Deployment, WorkloadKind::StatefulSet] {
            let workloads = self
                .client
                .list_workloads(kind, namespace)
                .await
                .map_err(|source| SchedulerError::ListWorkloads {
                    kind,
                    namespace: namespace.to_string(),
                    source,
                })?;

            for workload in &workloads {
                accumulate(&mut state, workload);
            }
        }

        Ok(state)
    }
}

/// Add one workload's replicas and replica-weighted requests to `state`
fn accumulate(state: &mut NamespaceState, workload: &Workload) {
    let replicas = f64::from(workload.replicas);
    state.pods += i64::from(workload.replicas);

    for container in &workload.containers {
        state.cpu += request_value(workload, "cpu", container.cpu.as_deref()) * replicas;
        state.memory += request_value(workload, "memory", container.memory.as_deref()) * replicas;
    }
}

fn request_value(workload: &Workload, resource: &str, quantity: Option<&str>) -> f64 {
    let Some(quantity) = quantity else {
        return 0.0;
    };

    parse_quantity(quantity).unwrap_or_else(|e| {
        warn!(
            kind = %workload.kind,
            workload = %workload.qualified_name(),
            resource = %resource,
            error = %e,
            "Ignoring malformed resource request"
        );
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::FakeCluster;

    fn aggregator(cluster: Arc<FakeCluster>) -> StateAggregator {
        let resolver = NamespaceResolver::new(cluster.clone());
        StateAggregator::new(cluster, resolver, SchedulerMetrics::new())
    }

    #[tokio::test]
    async fn test_single_deployment_aggregation() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["ns1"]));
        cluster.add_workload(
            Workload::new(WorkloadKind::Deployment, "ns1", "web", 3)
                .with_container(Some("500m"), Some("256Mi")),
        );

        let states = aggregator(cluster).get_state(&["ns1"]).await.unwrap();
        let state = states["ns1"];

        assert_eq!(state.pods, 3);
        assert!((state.cpu - 1.5).abs() < 1e-9);
        assert_eq!(state.memory, 768.0 * 1024.0 * 1024.0);
    }

    #[tokio::test]
    async fn test_aggregates_both_kinds_and_missing_requests() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["ns1"]));
        cluster.add_workload(
            Workload::new(WorkloadKind::Deployment, "ns1", "web", 2)
                .with_container(Some("250m"), None)
                .with_container(None, Some("1Gi")),
        );
        cluster.add_workload(
            Workload::new(WorkloadKind::StatefulSet, "ns1", "db", 1)
                .with_container(Some("2"), Some("512Mi")),
        );
        cluster.add_workload(Workload::new(WorkloadKind::Deployment, "ns1", "idle", 0));

        let states = aggregator(cluster).get_state(&["ns1"]).await.unwrap();
        let state = states["ns1"];

        assert_eq!(state.pods, 3);
        assert!((state.cpu - 2.5).abs() < 1e-9);
        assert_eq!(state.memory, 2.0 * 1_073_741_824.0 + 536_870_912.0);
    }

    #[tokio::test]
    async fn test_malformed_quantity_counts_as_zero() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["ns1"]));
        cluster.add_workload(
            Workload::new(WorkloadKind::Deployment, "ns1", "web", 2)
                .with_container(Some("lots"), Some("1Ki")),
        );

        let states = aggregator(cluster).get_state(&["ns1"]).await.unwrap();

        assert_eq!(states["ns1"].cpu, 0.0);
        assert_eq!(states["ns1"].memory, 2048.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_within_ttl_and_refresh_after() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["ns1"]));
        cluster.add_workload(Workload::new(WorkloadKind::Deployment, "ns1", "web", 1));
        let aggregator = aggregator(cluster.clone());

        aggregator.get_state(&["ns1"]).await.unwrap();
        assert_eq!(cluster.list_calls(WorkloadKind::Deployment, "ns1"), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        aggregator.get_state(&["ns1"]).await.unwrap();
        assert_eq!(cluster.list_calls(WorkloadKind::Deployment, "ns1"), 1);
        assert_eq!(cluster.list_calls(WorkloadKind::StatefulSet, "ns1"), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        aggregator.get_state(&["ns1"]).await.unwrap();
        assert_eq!(cluster.list_calls(WorkloadKind::Deployment, "ns1"), 2);
        assert_eq!(cluster.list_calls(WorkloadKind::StatefulSet, "ns1"), 2);
    }

    #[tokio::test]
    async fn test_duplicate_namespaces_collapse_and_hit_cache() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["team-a-dev", "team-a-prod"]));
        let aggregator = aggregator(cluster.clone());

        let states = aggregator
            .get_state(&["team-a-.*", "team-a-prod"])
            .await
            .unwrap();

        assert_eq!(states.len(), 2);
        assert_eq!(cluster.list_calls(WorkloadKind::Deployment, "team-a-prod"), 1);
    }
}
