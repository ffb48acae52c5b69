//! In-memory cluster used by tests

use super::ClusterClient;
use crate::error::ClusterError;
use crate::models::{Workload, WorkloadKind, WorkloadPatch};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A patch received by [`FakeCluster`]
#[derive(Debug, Clone, PartialEq)]
pub struct PatchCall {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub patch: WorkloadPatch,
}

#[derive(Default)]
struct FakeState {
    namespaces: Vec<String>,
    workloads: Vec<Workload>,
    patches: Vec<PatchCall>,
    list_calls: HashMap<(WorkloadKind, String), usize>,
    rejected: HashSet<String>,
    namespace_listing_fails: bool,
}

/// Cluster fake that applies patches to its own workload list, so repeated
/// transitions observe earlier ones
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cluster = Self::new();
        cluster.state().namespaces = namespaces.into_iter().map(Into::into).collect();
        cluster
    }

    pub fn add_workload(&self, workload: Workload) {
        self.state().workloads.push(workload);
    }

    /// Make every patch of `name` fail
    pub fn reject_patches_for(&self, name: &str) {
        self.state().rejected.insert(name.to_string());
    }

    pub fn fail_namespace_listing(&self) {
        self.state().namespace_listing_fails = true;
    }

    pub fn workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Option<Workload> {
        self.state()
            .workloads
            .iter()
            .find(|w| w.kind == kind && w.namespace == namespace && w.name == name)
            .cloned()
    }

    pub fn patches(&self) -> Vec<PatchCall> {
        self.state().patches.clone()
    }

    /// Number of listing calls for `kind` in `namespace`
    pub fn list_calls(&self, kind: WorkloadKind, namespace: &str) -> usize {
        self.state()
            .list_calls
            .get(&(kind, namespace.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let state = self.state();
        if state.namespace_listing_fails {
            return Err(ClusterError::Rejected("namespaces is forbidden".to_string()));
        }
        Ok(state.namespaces.clone())
    }

    async fn list_workloads(
        &self,
        kind: WorkloadKind,
        namespace: &str,
    ) -> Result<Vec<Workload>, ClusterError> {
        let mut state = self.state();
        *state
            .list_calls
            .entry((kind, namespace.to_string()))
            .or_default() += 1;

        Ok(state
            .workloads
            .iter()
            .filter(|w| w.kind == kind && w.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn patch_workload(
        &self,
        kind: WorkloadKind,
        name: &str,
        namespace: &str,
        patch: &WorkloadPatch,
    ) -> Result<(), ClusterError> {
        let mut state = self.state();
        state.patches.push(PatchCall {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            patch: patch.clone(),
        });

        if state.rejected.contains(name) {
            return Err(ClusterError::Rejected(format!(
                "{kind} '{namespace}/{name}' is forbidden"
            )));
        }

        let workload = state
            .workloads
            .iter_mut()
            .find(|w| w.kind == kind && w.namespace == namespace && w.name == name)
            .ok_or_else(|| ClusterError::Rejected(format!("{kind} '{namespace}/{name}' not found")))?;

        if let Some(annotations) = &patch.annotations {
            workload.annotations.extend(annotations.clone());
        }
        if let Some(replicas) = patch.replicas {
            workload.replicas = replicas;
        }

        Ok(())
    }
}
