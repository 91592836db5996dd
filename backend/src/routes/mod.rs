//! Route definitions for the Taskboard API
//!
//! This module organizes all API routes and applies middleware.

use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod auth;
mod health;
mod tasks;


pub use auth::{auth_routes, users_routes};
pub use tasks::task_routes;

/// Create the main application router with all middleware
pub fn create_router(state: AppState) -> Router {
    let uploads = &state.config().uploads;
    let public_path = format!("/{}", uploads.public_path.trim_matches('/'));
    let files = ServeDir::new(&uploads.dir);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .nest("/api", api_routes(state.clone()))
        .nest_service(&public_path, files)
        // Apply middleware layers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API routes
fn api_routes(state: AppState) -> Router<AppState> {
    let max_request_bytes = state.config().uploads.max_request_bytes;

    Router::new()
        .route("/", get(|| async { "Taskboard API" }))
        .nest("/auth", auth::auth_routes(max_request_bytes))
        .nest("/users", auth::users_routes(max_request_bytes))
        .nest("/tasks", tasks::task_routes(state))
}
