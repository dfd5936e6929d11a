//! Type definitions for the landmark classification server

pub mod prediction;
pub mod request;

pub use prediction::{ClassConfidences, ClassPrediction, PredictionResponse, PredictionResult};
pub use request::ImagePayload;
