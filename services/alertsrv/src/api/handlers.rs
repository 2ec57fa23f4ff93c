//! API handlers for the alert service

use alert_engine::{AlertError, AlertSet, MapLookup, Subscription, TickReport};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use common::logging;
use serde_json::{json, Value};
use tracing::info;

use crate::api::models::*;
use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

fn area_from(request: &AreaRequest) -> ApiResult<&str> {
    let area = request.area.trim();
    if area.is_empty() {
        return Err(AlertError::Config("area must not be empty".to_string()).into());
    }
    Ok(area)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    HEALTH_OK
}

/// Engine state and pending work
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: state.service_name.clone(),
        state: state.engine.state(),
        fake_alert_pending: state.fakes.is_pending(),
        maps_in_flight: state.maps.in_flight(),
    })
}

/// Currently stored active alerts
pub async fn list_alerts(State(state): State<AppState>) -> ApiResult<Json<AlertSet>> {
    Ok(Json(state.alerts.current().await?))
}

/// Run one reconciliation tick immediately
pub async fn reconcile(State(state): State<AppState>) -> ApiResult<Json<TickReport>> {
    info!("Manual reconcile requested");
    Ok(Json(state.engine.reconcile_now().await?))
}

/// Map for the currently stored alert set, rendering it if needed
pub async fn get_map(State(state): State<AppState>) -> ApiResult<Json<MapLookup>> {
    let alerts = state.alerts.current().await?;
    Ok(Json(state.maps.get_or_render(&alerts).await?))
}

/// Queue a fake alert for the next tick
pub async fn inject_fake_alert(
    State(state): State<AppState>,
    Json(request): Json<AreaRequest>,
) -> ApiResult<StatusCode> {
    state.fakes.inject(area_from(&request)?)?;
    Ok(StatusCode::ACCEPTED)
}

/// Areas tracked by a subscriber
pub async fn list_areas(
    State(state): State<AppState>,
    Path(subscriber_id): Path<i64>,
) -> ApiResult<Json<Vec<Subscription>>> {
    Ok(Json(state.ledger.list_tracking(subscriber_id).await?))
}

/// Start tracking an area
pub async fn track_area(
    State(state): State<AppState>,
    Path(subscriber_id): Path<i64>,
    Json(request): Json<AreaRequest>,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let area = area_from(&request)?;
    state.ledger.track(subscriber_id, area).await?;
    info!("Subscriber {} now tracks {}", subscriber_id, area);
    Ok((
        StatusCode::CREATED,
        Json(Subscription::new(subscriber_id, area)),
    ))
}

/// Stop tracking an area; untracking an unknown area is not an error
pub async fn untrack_area(
    State(state): State<AppState>,
    Path((subscriber_id, area)): Path<(i64, String)>,
) -> ApiResult<Json<UntrackResponse>> {
    let removed = state.ledger.stop_tracking(subscriber_id, &area).await?;
    if removed {
        info!("Subscriber {} stopped tracking {}", subscriber_id, area);
    }
    Ok(Json(UntrackResponse { removed }))
}

/// Active log filter
pub async fn get_log_level() -> Json<LogLevelBody> {
    Json(LogLevelBody {
        level: logging::get_log_level(),
    })
}

/// Replace the log filter at runtime
pub async fn set_log_level(
    Json(request): Json<LogLevelBody>,
) -> Result<Json<LogLevelBody>, (StatusCode, Json<Value>)> {
    match logging::set_log_level(&request.level) {
        Ok(()) => Ok(Json(request)),
        Err(e) => Err((StatusCode::BAD_REQUEST, Json(json!({ "error": e })))),
    }
}
