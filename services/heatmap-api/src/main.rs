//! Heatmap API service.
//!
//! HTTP server turning event coordinates into heatmap images over a
//! background map.

use anyhow::Result;
use clap::Parser;
use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use heatmap_api::{build_router, AppState, HeatmapConfig};

#[derive(Parser, Debug)]
#[command(name = "heatmap-api")]
#[command(about = "Heatmap rendering API server")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "HEATMAP_LISTEN", default_value = "0.0.0.0:8000")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long)]
    worker_threads: Option<usize>,

    /// YAML configuration file (default: environment variables)
    #[arg(short, long, env = "HEATMAP_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build tokio runtime with configurable worker threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    // Fall back to TOKIO_WORKER_THREADS if the CLI arg is not provided
    let worker_threads = args.worker_threads.or_else(|| {
        env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
    });
    if let Some(threads) = worker_threads.filter(|&n| n > 0) {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))?;
    Ok(())
}

async fn async_main(args: Args) -> Result<()> {
    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()?;
    info!("Prometheus metrics exporter initialized");

    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            HeatmapConfig::from_yaml_file(path)?
        }
        None => HeatmapConfig::from_env()?,
    };

    info!(
        environment = %config.environment,
        resources_dir = %config.resources_dir.display(),
        grid_bound = config.grid_bound,
        out_of_range = %config.out_of_range,
        unique_filenames = config.unique_filenames,
        upload = config.upload.enabled,
        "Starting heatmap API server"
    );

    // Initialize application state
    let state = Arc::new(AppState::new(config)?.with_prometheus(prometheus_handle));

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive()),
    );

    // Parse listen address
    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
