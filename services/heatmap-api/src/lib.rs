//! Heatmap API service library.
//!
//! Exposes the router and its building blocks so the binary and the
//! integration tests assemble the same service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod metrics;
pub mod pipeline;
pub mod state;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

pub use config::{Environment, HeatmapConfig};
pub use state::AppState;

/// Build the HTTP router.
///
/// `POST /heatmap` is only registered when the configuration enables it for
/// the current environment.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/metrics", get(handlers::api_metrics_handler));

    if state.config.heatmap_route_enabled() {
        router = router.route("/heatmap", post(handlers::heatmap_handler));
    } else {
        info!(
            environment = %state.config.environment,
            "Heatmap route disabled"
        );
    }

    router.layer(Extension(state))
}
