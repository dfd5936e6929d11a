//! Inference engine around the single loaded model

use crate::error::PredictError;
use crate::labels::ClassLabels;
use crate::models::loader::{LoadError, LoadedModel, ModelLoader, ModelShapes};
use crate::preprocess::InputTensor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;
use tract_tflite::prelude::*;

/// Anything that maps an input tensor to one raw score per class.
pub trait Classifier: Send + Sync {
    /// Model name, for logs
    fn name(&self) -> &str;

    /// Declared input and output shapes
    fn shapes(&self) -> &ModelShapes;

    /// Run the model once, returning the first output flattened
    fn infer(&self, input: InputTensor) -> Result<Vec<f32>, PredictError>;
}

/// Process-lifetime handle to the loaded model, shared by all requests
pub type ModelHandle = Arc<dyn Classifier>;

/// TFLite inference engine.
///
/// Every call to [`Classifier::infer`] holds the plan's mutex, so at most
/// one invocation runs at a time.
pub struct InferenceEngine {
    name: String,
    shapes: ModelShapes,
    plan: Mutex<TypedRunnableModel<TypedModel>>,
}

impl InferenceEngine {
    /// Wrap an already loaded model
    pub fn new(model: LoadedModel) -> Self {
        Self {
            name: model.name,
            shapes: model.shapes,
            plan: Mutex::new(model.plan),
        }
    }

    /// Load the model at `path` and check it against the label list
    pub fn load<P: AsRef<Path>>(
        path: P,
        loader: &ModelLoader,
        labels: &ClassLabels,
    ) -> Result<Self, LoadError> {
        let model = loader.load_model(path)?;

        let model_classes = model.shapes.num_classes();
        if model_classes != labels.len() {
            return Err(LoadError::ClassCountMismatch {
                model: model_classes,
                labels: labels.len(),
            });
        }

        Ok(Self::new(model))
    }
}

impl Classifier for InferenceEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn shapes(&self) -> &ModelShapes {
        &self.shapes
    }

    fn infer(&self, input: InputTensor) -> Result<Vec<f32>, PredictError> {
        if input.shape() != self.shapes.input.as_slice() {
            return Err(PredictError::ShapeMismatch {
                expected: self.shapes.input.clone(),
                actual: input.shape().to_vec(),
            });
        }

        let tensor: Tensor = input.into();
        let start = Instant::now();

        let outputs = {
            let plan = self
                .plan
                .lock()
                .map_err(|e| PredictError::Internal(format!("Lock error: {e}")))?;
            plan.run(tvec!(tensor.into()))
                .map_err(|e| PredictError::Inference(format!("{e:#}")))?
        };

        let first = outputs
            .first()
            .ok_or_else(|| PredictError::Inference("model produced no outputs".to_string()))?;
        let scores = first
            .cast_to::<f32>()
            .map_err(|e| PredictError::Inference(format!("output is not numeric: {e:#}")))?;
        let scores = scores
            .as_slice::<f32>()
            .map_err(|e| PredictError::Inference(format!("{e:#}")))?
            .to_vec();

        debug!(
            model = %self.name,
            scores = scores.len(),
            inference_us = start.elapsed().as_micros() as u64,
            "Inference complete"
        );

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loader::tests::{nine_class_model_bytes, reshape_model_bytes};
    use crate::prediction::PredictionPipeline;
    use crate::preprocess::tests::sample_png;
    use crate::preprocess::ImagePreprocessor;
    use crate::types::ImagePayload;
    use std::io::Write;
    use tract_tflite::prelude::tract_ndarray::Array4;

    fn model_file(raw: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".tflite")
            .tempfile()
            .unwrap();
        file.write_all(raw).unwrap();
        file
    }

    fn tiny_engine() -> InferenceEngine {
        let model = ModelLoader::new(3, 1)
            .load_from_bytes(&nine_class_model_bytes(), "tiny")
            .unwrap();
        InferenceEngine::new(model)
    }

    #[test]
    fn test_load_missing_model_is_an_error() {
        let err = InferenceEngine::load(
            "no/such/model.tflite",
            &ModelLoader::default(),
            &ClassLabels::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_load_checks_label_count() {
        let file = model_file(&nine_class_model_bytes());
        let labels = ClassLabels::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();

        let err = InferenceEngine::load(file.path(), &ModelLoader::new(3, 1), &labels)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LoadError::ClassCountMismatch {
                model: 9,
                labels: 3
            }
        ));

        let engine =
            InferenceEngine::load(file.path(), &ModelLoader::new(3, 1), &ClassLabels::default())
                .unwrap();
        assert_eq!(engine.shapes().num_classes(), 9);
    }

    #[test]
    fn test_grid_output_fails_at_load() {
        let file = model_file(&reshape_model_bytes(f32::datum_type(), 1, 3, &[1, 3, 3]));
        let labels = ClassLabels::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();

        let err = InferenceEngine::load(file.path(), &ModelLoader::new(3, 1), &labels)
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::UnsupportedOutput(_)));
    }

    #[test]
    fn test_infer_returns_one_score_per_class() {
        let engine = tiny_engine();
        let input = Array4::from_shape_fn((1, 1, 3, 3), |(_, _, x, c)| (x * 3 + c) as f32);

        let scores = engine.infer(input).unwrap();
        assert_eq!(scores, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_infer_rejects_wrong_input_shape() {
        let engine = tiny_engine();
        let err = engine.infer(Array4::zeros((1, 2, 2, 3))).unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch { ref expected, ref actual }
                if expected == &[1, 1, 3, 3] && actual == &[1, 2, 2, 3]
        ));
    }

    #[test]
    fn test_concurrent_inference() {
        let engine = Arc::new(tiny_engine());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    engine
                        .infer(Array4::from_elem((1, 1, 3, 3), i as f32))
                        .unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), vec![i as f32; 9]);
        }
    }

    #[test]
    fn test_pipeline_with_tflite_engine() {
        let engine = tiny_engine();
        let pipeline = PredictionPipeline::new(
            Arc::new(ClassLabels::default()),
            ImagePreprocessor::new(3, 1),
            3,
        );

        let result = pipeline
            .run(&engine, ImagePayload::Raw(sample_png(30, 10)))
            .unwrap();
        assert_eq!(result.top_classes.len(), 3);
        assert_eq!(result.all_predictions.len(), 9);
        assert!(result
            .top_classes
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(result.prediction.name, result.top_classes[0].name);
    }
}
