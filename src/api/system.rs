//! System-level endpoints: status aggregation and liveness/readiness
//! probes for deployment health checks.

use axum::{Extension, Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SystemStatus};
use crate::auth::ActorContext;

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

/// GET /system/status (admin only)
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    if !actor.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }

    let users = state.store().list_users().await?.len();
    let teams = state.store().list_teams().await?.len();
    let databases = state.store().list_databases().await?.len();

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        users,
        teams,
        databases,
    })))
}

/// GET /health/live — unauthenticated, process-is-up probe
pub async fn health_live() -> Json<HealthLiveResponse> {
    Json(HealthLiveResponse { status: "ok" })
}

/// GET /health/ready — unauthenticated, checks the store is reachable
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Json<HealthReadyResponse> {
    let database = state.store().ping().await.is_ok();

    Json(HealthReadyResponse {
        ready: database,
        checks: HealthReadinessChecks { database },
    })
}
