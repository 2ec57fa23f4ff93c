//! HTTP mapping for engine errors

use alert_engine::AlertError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Engine error returned from an admin API handler
#[derive(Debug)]
pub struct ApiError(pub AlertError);

impl From<AlertError> for ApiError {
    fn from(err: AlertError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AlertError::AlreadyTracking { .. } | AlertError::Busy(_) => StatusCode::CONFLICT,
            AlertError::Config(_) => StatusCode::BAD_REQUEST,
            AlertError::Fetch(_) | AlertError::Render(_) | AlertError::Send(_) => {
                StatusCode::BAD_GATEWAY
            },
            AlertError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AlertError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_expected() || status == StatusCode::BAD_REQUEST {
            warn!("Request rejected: {}", self.0);
        } else {
            error!("Request failed: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let conflict = ApiError(AlertError::AlreadyTracking {
            subscriber_id: 1,
            area: "X".to_string(),
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError(AlertError::Busy("slot".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(AlertError::Storage("disk".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(AlertError::Fetch("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
