use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::time::Instant;

use crate::{controller::AppState, ml::ModelKind};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    trained: bool,
    best_model: Option<ModelKind>,
    database: ComponentHealth,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// GET /healthz
///
/// An untrained engine is still healthy; it trains on the first request.
/// Only an unreachable history database degrades the service.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let database = match state.repos.history.health_check().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };
    let healthy = database.error.is_none();

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        trained: state.engine.is_trained().await,
        best_model: state.engine.best_model().await,
        database,
        timestamp: chrono::Utc::now(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    tracing::debug!(healthy, trained = response.trained, "health check completed");

    (code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_health() {
        let ok = ComponentHealth::healthy(3);
        assert_eq!(ok.status, "healthy");
        assert_eq!(ok.latency_ms, Some(3));

        let bad = ComponentHealth::unhealthy("pool closed".to_string());
        assert_eq!(bad.status, "unhealthy");
        assert_eq!(bad.error.as_deref(), Some("pool closed"));
    }
}
