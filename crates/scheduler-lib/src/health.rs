//! Health tracking for the scheduler daemon
//!
//! Backs the Kubernetes liveness and readiness probes. The daemon is only
//! useful while it can reach the cluster API, so readiness follows the
//! `cluster_api` component.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working, but the last operation reported problems
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const CLUSTER_API: &str = "cluster_api";
    pub const SCHEDULER: &str = "scheduler";
}

/// Shared, cloneable view of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    /// Record the result of a call that exercised `name`
    pub async fn record<T, E: std::fmt::Display>(&self, name: &str, result: &Result<T, E>) {
        let health = match result {
            Ok(_) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        };
        self.update(name, health).await;
    }

    /// Overall status is the worst component status
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy);

        HealthResponse { status, components }
    }

    /// Ready once the cluster API has been reached and is not failing
    pub async fn readiness(&self) -> ReadinessResponse {
        let components = self.components.read().await;
        let (ready, reason) = match components.get(components::CLUSTER_API) {
            None => (false, Some("Cluster API not yet checked".to_string())),
            Some(c) if c.status == ComponentStatus::Unhealthy => (
                false,
                Some(
                    c.message
                        .clone()
                        .unwrap_or_else(|| "Cluster API unreachable".to_string()),
                ),
            ),
            Some(_) => (true, None),
        };

        ReadinessResponse { ready, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_worst_component_wins() {
        let registry = HealthRegistry::new();
        registry.update(components::CLUSTER_API, ComponentHealth::healthy()).await;
        registry
            .update(components::SCHEDULER, ComponentHealth::degraded("1 patch failed"))
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .update(components::SCHEDULER, ComponentHealth::unhealthy("boom"))
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_follows_cluster_api() {
        let registry = HealthRegistry::new();

        let ok: Result<(), String> = Ok(());
        registry.record(components::CLUSTER_API, &ok).await;
        assert!(registry.readiness().await.ready);

        let failed: Result<(), String> = Err("connection refused".to_string());
        registry.record(components::CLUSTER_API, &failed).await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("connection refused"));
    }
}
