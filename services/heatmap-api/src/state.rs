//! Application state and shared resources.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::{info, warn};

use heatmap_common::{GridSpec, RenderMode};
use renderer::composite::load_font;
use renderer::RenderOptions;
use storage::ObjectStorage;

use crate::config::HeatmapConfig;
use crate::locks::OutputLocks;
use crate::metrics::MetricsCollector;

/// Shared application state.
pub struct AppState {
    pub config: HeatmapConfig,
    pub grid: GridSpec,
    pub render_options: RenderOptions,
    /// Present when uploads are enabled
    pub storage: Option<ObjectStorage>,
    pub metrics: Arc<MetricsCollector>,
    pub locks: OutputLocks,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Creates the output directories, loads a custom colorbar font if one is
    /// configured and connects the upload store when uploads are enabled.
    pub fn new(config: HeatmapConfig) -> Result<Self> {
        let grid = config.grid()?;

        for mode in [RenderMode::Smoothed, RenderMode::Precise] {
            let dir = config.output_dir(mode);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        }

        let maps_dir = config.maps_dir();
        if !maps_dir.is_dir() {
            warn!(path = %maps_dir.display(), "Background map directory does not exist");
        }

        let mut render_options = RenderOptions::default();
        match &config.font_path {
            Some(path) => {
                let font = load_font(path)
                    .with_context(|| format!("Failed to load font {}", path.display()))?;
                render_options.font = Some(Arc::new(font));
            }
            None => info!("Using the bundled colorbar font"),
        }

        let storage = if config.upload.enabled {
            let storage = ObjectStorage::new(&config.upload.storage)?;
            info!(
                endpoint = %config.upload.storage.endpoint,
                bucket = %config.upload.storage.bucket,
                "Heatmap upload enabled"
            );
            Some(storage)
        } else {
            None
        };

        Ok(Self {
            config,
            grid,
            render_options,
            storage,
            metrics: Arc::new(MetricsCollector::new()),
            locks: OutputLocks::new(),
            prometheus: None,
        })
    }

    /// Replace the upload store, e.g. with an in-memory one.
    pub fn with_storage(mut self, storage: ObjectStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
