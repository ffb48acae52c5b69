//! Cluster API access
//!
//! The scheduler only needs three calls from the cluster: list namespaces,
//! list workloads of a kind in a namespace, and patch a workload. They are
//! expressed by [`ClusterClient`] so the engine can run against a real API
//! server ([`KubeClusterClient`]) or an in-memory fake in tests.

mod kubernetes;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use kubernetes::{ClusterTarget, KubeClusterClient};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCluster, PatchCall};

use crate::error::ClusterError;
use crate::models::{Workload, WorkloadKind, WorkloadPatch};

pub use async_trait::async_trait;

/// Operations the scheduler consumes from the cluster API
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Names of all namespaces, in listing order
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError>;

    /// Workloads of `kind` in `namespace`, in listing order
    async fn list_workloads(
        &self,
        kind: WorkloadKind,
        namespace: &str,
    ) -> Result<Vec<Workload>, ClusterError>;

    /// Apply a partial update to a workload's annotations and/or replicas
    async fn patch_workload(
        &self,
        kind: WorkloadKind,
        name: &str,
        namespace: &str,
        patch: &WorkloadPatch,
    ) -> Result<(), ClusterError>;
}
