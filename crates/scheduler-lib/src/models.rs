//! Core data models for the namespace scheduler

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of scalable workload managed by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadKind::Deployment => write!(f, "Deployment"),
            WorkloadKind::StatefulSet => write!(f, "StatefulSet"),
        }
    }
}

/// Direction of a namespace power transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleAction {
    Up,
    Down,
}

impl ScaleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleAction::Up => "up",
            ScaleAction::Down => "down",
        }
    }
}

impl fmt::Display for ScaleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource requests of a single pod template container, in quantity notation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRequests {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

/// Snapshot of a Deployment or StatefulSet as read from the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    /// Desired replica count currently set on the resource
    pub replicas: i32,
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<ContainerRequests>,
}

impl Workload {
    pub fn new(
        kind: WorkloadKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        replicas: i32,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            replicas,
            annotations: BTreeMap::new(),
            containers: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_container(mut self, cpu: Option<&str>, memory: Option<&str>) -> Self {
        self.containers.push(ContainerRequests {
            cpu: cpu.map(str::to_string),
            memory: memory.map(str::to_string),
        });
        self
    }

    /// `namespace/name`, the form used in log lines
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Aggregated resource allocation of a namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceState {
    /// Sum of replica counts across Deployments and StatefulSets
    pub pods: i64,
    /// Requested CPU in cores
    pub cpu: f64,
    /// Requested memory in bytes
    pub memory: f64,
}

/// Partial update of a workload's annotations and/or replica count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl WorkloadPatch {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_none() && self.replicas.is_none()
    }

    /// Render as a JSON merge patch body containing only the parts that are set
    pub fn to_merge_patch(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(annotations) = &self.annotations {
            body.insert(
                "metadata".to_string(),
                serde_json::json!({ "annotations": annotations }),
            );
        }
        if let Some(replicas) = self.replicas {
            body.insert("spec".to_string(), serde_json::json!({ "replicas": replicas }));
        }
        serde_json::Value::Object(body)
    }
}

/// Result of routing one workload through the transition engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// Nothing to change
    Intact { replicas: i32 },
    /// Replica count changed
    Scaled { from: i32, to: i32 },
    /// The patch was rejected by the cluster
    Failed { error: String },
}

/// Per-workload entry of a scale report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub outcome: TransitionOutcome,
}

/// Summary of an up or down invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleReport {
    pub action: ScaleAction,
    /// Resolved namespaces in processing order
    pub namespaces: Vec<String>,
    pub workloads: Vec<WorkloadReport>,
    pub scaled: usize,
    pub intact: usize,
    pub failed: usize,
    pub pauses: usize,
}

impl ScaleReport {
    pub fn new(action: ScaleAction, namespaces: Vec<String>) -> Self {
        Self {
            action,
            namespaces,
            workloads: Vec::new(),
            scaled: 0,
            intact: 0,
            failed: 0,
            pauses: 0,
        }
    }

    pub fn record(&mut self, workload: &Workload, outcome: TransitionOutcome) {
        match outcome {
            TransitionOutcome::Intact { .. } => self.intact += 1,
            TransitionOutcome::Scaled { .. } => self.scaled += 1,
            TransitionOutcome::Failed { .. } => self.failed += 1,
        }
        self.workloads.push(WorkloadReport {
            kind: workload.kind,
            namespace: workload.namespace.clone(),
            name: workload.name.clone(),
            outcome,
        });
    }
}
