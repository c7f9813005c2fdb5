//! Request to image pipeline.
//!
//! validate → aggregate → render on the blocking pool → write → upload.
//! The request is never modified; every stage produces a new value.

use std::path::PathBuf;

use heatmap_common::{aggregate, HeatmapError, HeatmapRequest, HeatmapResult, RenderMode};
use renderer::composite::{load_background, render_heatmap, save_png};
use storage::StoragePath;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::metrics::Timer;
use crate::state::AppState;

/// Outcome of one successful request.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Bare filename of the written image
    pub image_id: String,
    pub path: PathBuf,
    pub mode: RenderMode,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    /// Storage ETag when the image was uploaded
    pub etag: Option<String>,
}

/// Generate, write and optionally upload one heatmap.
pub async fn generate(state: &AppState, request: &HeatmapRequest) -> HeatmapResult<RenderResult> {
    request.validate()?;
    let sigma = request.sigma_within(state.config.effective_max_sigma())?;
    let mode = request.mode();
    let points = aggregate(&request.coordinates)?;

    debug!(
        records = request.coordinates.len(),
        distinct = points.len(),
        mode = %mode,
        sigma,
        "Aggregated coordinates"
    );

    let token = state
        .config
        .unique_filenames
        .then(|| Uuid::new_v4().simple().to_string());
    let image_id = mode.filename(&request.played_map, &request.event, token.as_deref());
    let path = state.config.output_dir(mode).join(&image_id);

    let _guard = state.locks.acquire(&image_id).await;

    let timer = Timer::start();
    let rendered = {
        let maps_dir = state.config.maps_dir();
        let played_map = request.played_map.clone();
        let event = request.event.clone();
        let grid = state.grid;
        let opts = state.render_options.clone();
        let path = path.clone();

        tokio::task::spawn_blocking(move || -> HeatmapResult<(u32, u32, usize)> {
            let background = load_background(&maps_dir, &played_map)?;
            let img = render_heatmap(mode, &background, &points, &grid, sigma, &event, &opts)?;
            let bytes = save_png(&img, &path)?;
            Ok((img.width(), img.height(), bytes))
        })
        .await
        .map_err(|e| HeatmapError::InternalError(format!("render task failed: {}", e)))
        .and_then(|r| r)
    };
    state
        .metrics
        .record_render(timer.elapsed_us(), mode, rendered.is_ok())
        .await;
    let (width, height, bytes) = rendered?;

    info!(
        image_id = %image_id,
        mode = %mode,
        width,
        height,
        bytes,
        duration_ms = timer.elapsed_ms(),
        "Heatmap written"
    );

    let etag = match &state.storage {
        Some(storage) => {
            let key = StoragePath::heatmap(state.config.upload.prefix.as_deref(), &image_id);
            let upload_timer = Timer::start();
            let result = storage
                .upload_file(&path, &key, &state.config.upload.content_type)
                .await;
            state
                .metrics
                .record_upload(upload_timer.elapsed_us(), result.is_ok())
                .await;
            match result {
                Ok(etag) => Some(etag),
                Err(e) => {
                    error!(key = %key, error = %e, "Heatmap upload failed");
                    return Err(e.into());
                }
            }
        }
        None => None,
    };

    Ok(RenderResult {
        image_id,
        path,
        mode,
        width,
        height,
        bytes,
        etag,
    })
}
