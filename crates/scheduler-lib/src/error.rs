//! Error types for the scheduler library

use crate::models::WorkloadKind;
use thiserror::Error;

/// Failure talking to the cluster API
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("failed to load in-cluster configuration: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Rejection reported by a non-kube client implementation
    #[error("{0}")]
    Rejected(String),
}

/// Malformed Kubernetes quantity string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("quantity '{0}' has no numeric part")]
    MissingNumber(String),

    #[error("quantity '{quantity}' has unknown suffix '{suffix}'")]
    UnknownSuffix { quantity: String, suffix: String },
}

/// Errors that fail a whole up/down/state invocation
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid namespace pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to list namespaces: {0}")]
    ListNamespaces(#[source] ClusterError),

    #[error("failed to list {kind} workloads in namespace '{namespace}': {source}")]
    ListWorkloads {
        kind: WorkloadKind,
        namespace: String,
        #[source]
        source: ClusterError,
    },

    #[error("operation cancelled by shutdown")]
    Cancelled,
}

impl SchedulerError {
    /// Stable machine-readable code used in API error responses
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::InvalidPattern { .. } => "invalid_pattern",
            SchedulerError::ListNamespaces(_) => "list_namespaces_failed",
            SchedulerError::ListWorkloads { .. } => "list_workloads_failed",
            SchedulerError::Cancelled => "cancelled",
        }
    }
}

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;
