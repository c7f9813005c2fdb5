//! `POST /heatmap` handler.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use heatmap_common::HeatmapRequest;

use crate::error::ApiError;
use crate::pipeline;
use crate::state::AppState;

/// Success body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HeatmapResponse {
    pub message: String,
    /// Filename of the generated image
    pub heatmap: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// POST /heatmap - render a heatmap from a list of coordinates
#[instrument(skip(state, payload))]
pub async fn heatmap_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<HeatmapRequest>, JsonRejection>,
) -> Response {
    state.metrics.record_request();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            state.metrics.record_rejected();
            return ApiError::InvalidBody(rejection.body_text()).into_response();
        }
    };

    info!(
        played_map = %request.played_map,
        event = %request.event,
        records = request.coordinates.len(),
        is_accurate = request.is_accurate,
        sigma = request.sigma,
        "Received heatmap request"
    );

    match pipeline::generate(&state, &request).await {
        Ok(result) => (
            StatusCode::OK,
            Json(HeatmapResponse {
                message: "Heatmap created successfully".to_string(),
                heatmap: result.image_id,
                etag: result.etag,
            }),
        )
            .into_response(),
        Err(e) => {
            if e.is_validation_error() {
                state.metrics.record_rejected();
            }
            ApiError::from(e).into_response()
        }
    }
}
