//! The per-request prediction pipeline: decode, preprocess, infer, rank.
//!
//! Every stage returns its own `Result`, so each failure mode can be
//! exercised without an HTTP request.

use crate::error::PredictError;
use crate::labels::ClassLabels;
use crate::models::Classifier;
use crate::preprocess::{ImagePreprocessor, InputTensor};
use crate::types::{ImagePayload, PredictionResult};
use image::DynamicImage;
use std::sync::Arc;

/// Stateless pipeline configuration shared by all requests
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    labels: Arc<ClassLabels>,
    preprocessor: ImagePreprocessor,
    top_k: usize,
}

impl PredictionPipeline {
    pub fn new(labels: Arc<ClassLabels>, preprocessor: ImagePreprocessor, top_k: usize) -> Self {
        Self {
            labels,
            preprocessor,
            top_k,
        }
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// Stage 1: transport payload to encoded image bytes
    pub fn decode_payload(&self, payload: ImagePayload) -> Result<Vec<u8>, PredictError> {
        payload.into_bytes()
    }

    /// Stage 2: encoded bytes to an image
    pub fn decode_image(&self, bytes: &[u8]) -> Result<DynamicImage, PredictError> {
        self.preprocessor.decode(bytes)
    }

    /// Stage 3: image to model input tensor
    pub fn preprocess(&self, image: &DynamicImage) -> InputTensor {
        self.preprocessor.to_tensor(image)
    }

    /// Stage 4: run the model
    pub fn infer(
        &self,
        model: &dyn Classifier,
        input: InputTensor,
    ) -> Result<Vec<f32>, PredictError> {
        model.infer(input)
    }

    /// Stage 5: normalize and rank raw scores
    pub fn rank(&self, raw_scores: &[f32]) -> Result<PredictionResult, PredictError> {
        PredictionResult::from_scores(&self.labels, raw_scores, self.top_k)
    }

    /// All stages end to end
    pub fn run(
        &self,
        model: &dyn Classifier,
        payload: ImagePayload,
    ) -> Result<PredictionResult, PredictError> {
        let bytes = self.decode_payload(payload)?;
        let image = self.decode_image(&bytes)?;
        let input = self.preprocess(&image);
        let raw_scores = self.infer(model, input)?;
        self.rank(&raw_scores)
    }
}
