//! Companion `model_config.json` describing the deployed model

use crate::models::loader::ModelShapes;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape metadata shipped next to the model file for browser-side loaders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    /// Artifact format, always "tflite" for this server
    pub format: String,
    /// Model file name, relative to the manifest
    pub model_file: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub num_classes: usize,
}

impl ModelManifest {
    /// Describe a model from its shapes
    pub fn from_shapes(model_file: &str, shapes: &ModelShapes) -> Self {
        Self {
            format: "tflite".to_string(),
            model_file: model_file.to_string(),
            input_shape: shapes.input.clone(),
            output_shape: shapes.output.clone(),
            num_classes: shapes.num_classes(),
        }
    }

    /// Read a manifest file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model manifest {}", path.display()))
    }

    /// Describe each way this manifest disagrees with the loaded model
    pub fn check_against(&self, shapes: &ModelShapes) -> Vec<String> {
        let mut problems = Vec::new();

        if self.format != "tflite" {
            problems.push(format!("format is '{}', expected 'tflite'", self.format));
        }
        if self.input_shape != shapes.input {
            problems.push(format!(
                "inputShape {:?} differs from model input {:?}",
                self.input_shape, shapes.input
            ));
        }
        if self.output_shape != shapes.output {
            problems.push(format!(
                "outputShape {:?} differs from model output {:?}",
                self.output_shape, shapes.output
            ));
        }
        if self.num_classes != shapes.num_classes() {
            problems.push(format!(
                "numClasses {} differs from model class count {}",
                self.num_classes,
                shapes.num_classes()
            ));
        }

        problems
    }
}
