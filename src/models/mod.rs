//! ML model loading, inference and score post-processing

pub mod inference;
pub mod loader;
pub mod manifest;
pub mod scoring;

pub use inference::{Classifier, InferenceEngine, ModelHandle};
pub use loader::{LoadError, LoadedModel, ModelLoader, ModelShapes};
pub use manifest::ModelManifest;
