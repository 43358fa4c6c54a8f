//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pvision_api::{create_router, metrics, ApiConfig, AppState};
use pvision_media::YoloDetector;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("pvision=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting pvision-api");

    // Load configuration
    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    // Create application state and storage directories
    let state = AppState::new(config.clone());
    if let Err(e) = state.store.ensure_dirs().await {
        error!("Failed to create storage directories: {}", e);
        std::process::exit(1);
    }

    // Initialize metrics
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    // Load the model off the startup path; the server accepts traffic
    // immediately and detection endpoints answer 503 until this finishes.
    let loader_state = state.clone();
    tokio::spawn(async move {
        loader_state.readiness.set_loading().await;
        let detector_config = loader_state.config.detector_config();
        info!(model_path = %detector_config.model_path.display(), "loading detection model");

        match tokio::task::spawn_blocking(move || YoloDetector::new(detector_config)).await {
            Ok(Ok(detector)) => {
                loader_state.install_detector(Arc::new(detector)).await;
            }
            Ok(Err(e)) => {
                error!("Model load failed: {}", e);
                loader_state.readiness.set_failed(e.to_string()).await;
            }
            Err(e) => {
                error!("Model load task failed: {}", e);
                loader_state
                    .readiness
                    .set_failed("model load task panicked")
                    .await;
            }
        }
    });

    // Create router
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
