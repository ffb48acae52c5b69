//! HTTP API for namespace up/down/state, health checks and Prometheus metrics

use crate::error::SchedulerError;
use crate::health::{components, ComponentHealth, ComponentStatus, HealthRegistry};
use crate::models::ScaleReport;
use crate::scheduler::NamespaceScheduler;
use crate::shutdown::ShutdownSignal;
use crate::throttle::BatchPolicy;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scheduler: NamespaceScheduler,
    pub health_registry: HealthRegistry,
    /// Batch policy used when an up request leaves it unspecified
    pub default_batch: BatchPolicy,
}

impl AppState {
    pub fn new(
        scheduler: NamespaceScheduler,
        health_registry: HealthRegistry,
        default_batch: BatchPolicy,
    ) -> Self {
        Self {
            scheduler,
            health_registry,
            default_batch,
        }
    }

    /// Update cluster API health from the result of any scheduler call
    async fn observe_cluster<T>(&self, result: &Result<T, SchedulerError>) {
        match result {
            Ok(_) => {
                self.health_registry
                    .update(components::CLUSTER_API, ComponentHealth::healthy())
                    .await;
            }
            Err(e @ (SchedulerError::ListNamespaces(_) | SchedulerError::ListWorkloads { .. })) => {
                self.health_registry
                    .update(components::CLUSTER_API, ComponentHealth::unhealthy(e.to_string()))
                    .await;
            }
            Err(_) => {}
        }
    }

    /// Update cluster API and scheduler health from an up/down result
    async fn observe_scale(&self, result: &Result<ScaleReport, SchedulerError>) {
        self.observe_cluster(result).await;

        if let Ok(report) = result {
            let scheduler_health = if report.failed > 0 {
                ComponentHealth::degraded(format!(
                    "{} workload patch(es) failed during {}",
                    report.failed, report.action
                ))
            } else {
                ComponentHealth::healthy()
            };
            self.health_registry
                .update(components::SCHEDULER, scheduler_health)
                .await;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpRequest {
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespacesRequest {
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Scheduler error rendered as a JSON response
pub struct ApiError(SchedulerError);

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SchedulerError::InvalidPattern { .. } => StatusCode::BAD_REQUEST,
            SchedulerError::ListNamespaces(_) | SchedulerError::ListWorkloads { .. } => {
                StatusCode::BAD_GATEWAY
            }
            SchedulerError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpRequest>,
) -> Result<Json<ScaleReport>, ApiError> {
    let policy = BatchPolicy::new(
        request.batch_size.unwrap_or(state.default_batch.size),
        request
            .batch_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(state.default_batch.interval),
    );
    info!(namespaces = ?request.namespaces, batch_size = policy.size, "Up requested");

    let result = state.scheduler.up(&request.namespaces[..], policy).await;
    state.observe_scale(&result).await;
    Ok(Json(result?))
}

async fn down(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NamespacesRequest>,
) -> Result<Json<ScaleReport>, ApiError> {
    info!(namespaces = ?request.namespaces, "Down requested");

    let result = state.scheduler.down(&request.namespaces[..]).await;
    state.observe_scale(&result).await;
    Ok(Json(result?))
}

async fn namespace_state(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NamespacesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.scheduler.state(&request.namespaces[..]).await;
    state.observe_cluster(&result).await;
    Ok(Json(result?))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/up", post(up))
        .route("/api/v1/down", post(down))
        .route("/api/v1/state", post(namespace_state))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server; returns once `shutdown` fires and in-flight
/// requests have drained
pub async fn serve(port: u16, state: Arc<AppState>, shutdown: ShutdownSignal) -> std::io::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
