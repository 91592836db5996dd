//! Health check endpoints
//!
//! - `/health` basic check
//! - `/health/ready` readiness, checks the database and the avatar directory
//! - `/health/live` liveness, OK whenever the process is serving

use crate::{db, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<HealthChecks>,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckStatus,
    pub uploads: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                healthy: true,
                message: None,
            },
            Err(e) => Self {
                healthy: false,
                message: Some(e.to_string()),
            },
        }
    }
}

fn plain(status: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        checks: None,
    })
}

pub async fn health_check() -> Json<HealthResponse> {
    plain("healthy")
}

/// Returns 503 when a dependency is unavailable
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = CheckStatus::from_result(db::health_check(state.db()).await);
    let uploads = CheckStatus::from_result(state.avatars().ensure_dir().await);
    let ready = database.healthy && uploads.healthy;

    let response = Json(HealthResponse {
        status: if ready { "ready" } else { "not_ready" },
        version: env!("CARGO_PKG_VERSION"),
        checks: Some(HealthChecks { database, uploads }),
    });

    if ready {
        Ok(response)
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, response))
    }
}

pub async fn liveness_check() -> Json<HealthResponse> {
    plain("alive")
}
