//! HTTP error responses.
//!
//! Every failure is returned as `{"detail": "..."}`. Request problems echo the
//! cause; service-side failures log it and return a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use heatmap_common::HeatmapError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    /// The body could not be parsed as a heatmap request
    InvalidBody(String),
    Heatmap(HeatmapError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Heatmap(e) => StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// User-facing detail message.
    pub fn detail(&self) -> String {
        match self {
            ApiError::InvalidBody(msg) => format!("Invalid 'heatmap' value: {}", msg),
            ApiError::Heatmap(e) if e.is_validation_error() => {
                format!("Invalid 'heatmap' value: {}", e)
            }
            ApiError::Heatmap(e @ HeatmapError::MapNotFound(_)) => e.to_string(),
            ApiError::Heatmap(HeatmapError::UploadError(_)) => "Error uploading heatmap".to_string(),
            ApiError::Heatmap(_) => "Error generating heatmap".to_string(),
        }
    }
}

impl From<HeatmapError> for ApiError {
    fn from(err: HeatmapError) -> Self {
        ApiError::Heatmap(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::InvalidBody(msg) => warn!(error = %msg, "Rejected heatmap request body"),
            ApiError::Heatmap(e) if status.is_client_error() => {
                warn!(error = %e, status = status.as_u16(), "Rejected heatmap request")
            }
            ApiError::Heatmap(e) => {
                error!(error = %e, status = status.as_u16(), "Heatmap generation failed")
            }
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
