//! API routes configuration

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::*;
use crate::AppState;

/// Create API routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/alerts", get(list_alerts))
        .route("/api/v1/reconcile", post(reconcile))
        .route("/api/v1/map", get(get_map))
        .route("/api/v1/fake-alerts", post(inject_fake_alert))
        .route(
            "/api/v1/subscribers/{id}/areas",
            get(list_areas).post(track_area),
        )
        .route(
            "/api/v1/subscribers/{id}/areas/{area}",
            delete(untrack_area),
        )
        .route(
            "/api/v1/log-level",
            get(get_log_level).put(set_log_level),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
