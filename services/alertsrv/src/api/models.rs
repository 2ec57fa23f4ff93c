//! API request and response models

use alert_engine::EngineState;
use serde::{Deserialize, Serialize};

/// Health check endpoint response
pub const HEALTH_OK: &str = "OK";

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub state: EngineState,
    pub fake_alert_pending: bool,
    pub maps_in_flight: usize,
}

/// Body of `POST /subscribers/{id}/areas` and `POST /fake-alerts`
#[derive(Debug, Deserialize)]
pub struct AreaRequest {
    pub area: String,
}

#[derive(Debug, Serialize)]
pub struct UntrackResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogLevelBody {
    pub level: String,
}
