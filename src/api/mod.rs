//! HTTP API: router, shared state and handlers

pub mod info;
pub mod predict;

use crate::config::AppConfig;
use crate::metrics::ServiceMetrics;
use crate::models::{Classifier, InferenceEngine, ModelHandle, ModelLoader, ModelManifest};
use crate::prediction::PredictionPipeline;
use crate::preprocess::ImagePreprocessor;
use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// State injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// The loaded model, absent when startup loading failed
    pub model: Option<ModelHandle>,
    pub pipeline: Arc<PredictionPipeline>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        model: Option<ModelHandle>,
        pipeline: PredictionPipeline,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            model,
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }

    /// Build state from configuration, loading the model once.
    ///
    /// A model that fails to load is logged and left unavailable; the server
    /// still starts and `/predict` answers with an error.
    pub fn from_config(config: &AppConfig, metrics: Arc<ServiceMetrics>) -> Result<Self> {
        let labels = Arc::new(config.class_labels()?);
        let (width, height) = (config.model.input_width, config.model.input_height);
        let preprocessor = ImagePreprocessor::new(width, height);
        let loader = ModelLoader::new(width, height);

        let loaded = InferenceEngine::load(&config.model.path, &loader, &labels);
        let model: Option<ModelHandle> = match loaded {
            Ok(engine) => {
                check_manifest(config, &engine);
                Some(Arc::new(engine))
            }
            Err(e) => {
                error!(path = %config.model.path.display(), error = %e, "Error loading model");
                None
            }
        };

        let pipeline = PredictionPipeline::new(labels, preprocessor, config.model.top_k);
        Ok(Self::new(model, pipeline, metrics))
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }
}

fn check_manifest(config: &AppConfig, engine: &InferenceEngine) {
    let Some(path) = config.model.manifest_path.as_ref() else {
        return;
    };
    if !path.exists() {
        debug!(path = %path.display(), "No model manifest found");
        return;
    }

    match ModelManifest::load(path) {
        Ok(manifest) => {
            let problems = manifest.check_against(engine.shapes());
            if problems.is_empty() {
                info!(path = %path.display(), "Model manifest matches loaded model");
            }
            for problem in problems {
                warn!(path = %path.display(), "Model manifest mismatch: {}", problem);
            }
        }
        Err(e) => warn!(error = %e, "Ignoring unreadable model manifest"),
    }
}

/// Build the application router
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(info::health))
        .route("/classes", get(info::classes))
        .route("/predict", post(predict::predict))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
