//! Landmark Classification Server Library
//!
//! Serves predictions from a pretrained TFLite landmark classifier over
//! HTTP: decode an uploaded image, normalize it to the model input, run the
//! model once, and rank the resulting class probabilities.

pub mod api;
pub mod config;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod prediction;
pub mod preprocess;
pub mod types;

pub use api::AppState;
pub use config::AppConfig;
pub use error::PredictError;
pub use labels::ClassLabels;
pub use models::inference::{Classifier, InferenceEngine, ModelHandle};
pub use prediction::PredictionPipeline;
pub use preprocess::ImagePreprocessor;
pub use types::{ImagePayload, PredictionResponse, PredictionResult};
