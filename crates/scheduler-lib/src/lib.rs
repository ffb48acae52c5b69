//! Namespace scheduler library
//!
//! This crate provides the core functionality for:
//! - Reversible scale-down of Deployments and StatefulSets to zero replicas
//! - Batch-throttled restoration of the saved replica counts
//! - Cached aggregation of namespace resource requests
//! - The HTTP API, health checks and observability of the daemon

pub mod annotation;
pub mod api;
pub mod cluster;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod resolver;
pub mod scheduler;
pub mod shutdown;
pub mod state;
pub mod throttle;
pub mod transition;

pub use cluster::{ClusterClient, ClusterTarget, KubeClusterClient};
pub use error::{ClusterError, QuantityError, SchedulerError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{SchedulerMetrics, StructuredLogger};
pub use scheduler::{NamespaceScheduler, NamespaceSchedulerBuilder};
pub use throttle::BatchPolicy;
