//! Landmark Classification Server - Main Entry Point
//!
//! Loads the TFLite model once, then serves `/health`, `/classes` and
//! `/predict` until interrupted.

use anyhow::{Context, Result};
use landmark_classifier::{
    api,
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    AppState,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;

    info!("Starting Landmark Classification Server");
    info!(
        classes = config.labels.classes.len(),
        input = format!("{}x{}", config.model.input_width, config.model.input_height),
        top_k = config.model.top_k,
        "Configuration loaded successfully"
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());

    // Load the model and build shared state
    let state = AppState::from_config(&config, metrics.clone())?;
    if !state.model_loaded() {
        warn!("Model not loaded. Server will start but predictions will fail.");
        warn!(
            path = %config.model.path.display(),
            "Make sure the .tflite model exists at the configured path"
        );
    }

    // Start metrics reporter
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = api::router(state, config.server.body_limit_bytes);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server endpoints:");
    info!("   GET  /health  - Health check");
    info!("   GET  /classes - List all classes");
    info!("   POST /predict - Make predictions");
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Print final summary
    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "landmark_classifier={level},tower_http={level}",
            level = logging.level
        ))
    })?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
