//! TFLite model loader

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use tract_tflite::prelude::*;

use crate::preprocess::CHANNELS;

/// FlatBuffer file identifier of TFLite models, stored at byte offset 4
const TFLITE_IDENTIFIER: &[u8; 4] = b"TFL3";

/// Why a model could not be made ready for inference
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model file {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("model data is not a TFLite FlatBuffer (no TFL3 identifier)")]
    NotTflite,

    #[error("unsupported model input type {0}; only f32 inputs are supported")]
    UnsupportedInput(String),

    #[error("model output shape is not fully known: {0}")]
    DynamicOutput(String),

    #[error("model output shape {0:?} is not a single score vector")]
    UnsupportedOutput(Vec<usize>),

    #[error("model declares {model} classes but {labels} labels are configured")]
    ClassCountMismatch { model: usize, labels: usize },

    #[error("TFLite runtime error: {0}")]
    Runtime(String),
}

fn runtime(err: TractError) -> LoadError {
    LoadError::Runtime(format!("{err:#}"))
}

/// Declared input and output tensor shapes of a loaded model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelShapes {
    pub input: Vec<usize>,
    pub output: Vec<usize>,
}

impl ModelShapes {
    /// Number of classes, taken from the last output dimension.
    ///
    /// Loaded models always have leading output dimensions of 1, so this is
    /// also the number of scores one inference yields.
    pub fn num_classes(&self) -> usize {
        self.output.last().copied().unwrap_or(0)
    }
}

impl fmt::Display for ModelShapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input {:?} -> output {:?}", self.input, self.output)
    }
}

/// Optimized, runnable TFLite model with metadata
pub struct LoadedModel {
    /// Model name (file stem)
    pub name: String,
    /// Runnable plan
    pub plan: TypedRunnableModel<TypedModel>,
    /// Declared tensor shapes
    pub shapes: ModelShapes,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("shapes", &self.shapes)
            .finish_non_exhaustive()
    }
}

/// Loader for TFLite image classification models
#[derive(Debug, Clone, Copy)]
pub struct ModelLoader {
    input_width: u32,
    input_height: u32,
}

impl ModelLoader {
    /// Create a loader that pins model input to `[1, height, width, 3]` f32
    pub fn new(input_width: u32, input_height: u32) -> Self {
        Self {
            input_width,
            input_height,
        }
    }

    /// Load a model from a .tflite file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel, LoadError> {
        let path = path.as_ref();

        info!(path = %path.display(), "Loading TFLite model");

        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.is_empty() {
            return Err(LoadError::Empty(path.to_path_buf()));
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        self.load_from_bytes(&raw, &name)
    }

    /// Load a model from an in-memory buffer
    pub fn load_from_bytes(&self, raw: &[u8], name: &str) -> Result<LoadedModel, LoadError> {
        let model_bytes = find_tflite_slice(raw).ok_or(LoadError::NotTflite)?;

        let mut cursor = Cursor::new(model_bytes);
        let model = tract_tflite::tflite()
            .model_for_read(&mut cursor)
            .map_err(runtime)?;

        let inlet = model
            .input_outlets()
            .map_err(runtime)?
            .first()
            .copied()
            .ok_or_else(|| LoadError::Runtime("model has no inputs".to_string()))?;
        let declared = model.outlet_fact(inlet).map_err(runtime)?;
        if declared.datum_type != f32::datum_type() {
            return Err(LoadError::UnsupportedInput(format!(
                "{:?}",
                declared.datum_type
            )));
        }

        let input_shape = vec![
            1,
            self.input_height as usize,
            self.input_width as usize,
            CHANNELS,
        ];
        let input_fact = TypedFact::dt_shape(
            f32::datum_type(),
            tvec!(
                1,
                self.input_height as usize,
                self.input_width as usize,
                CHANNELS
            ),
        );
        let optimized = model
            .with_input_fact(0, input_fact)
            .map_err(runtime)?
            .into_optimized()
            .map_err(runtime)?;

        let output_fact = optimized.output_fact(0).map_err(runtime)?;
        let output_shape = output_fact
            .shape
            .as_concrete()
            .map(<[usize]>::to_vec)
            .ok_or_else(|| LoadError::DynamicOutput(format!("{:?}", output_fact.shape)))?;
        if !is_score_vector(&output_shape) {
            return Err(LoadError::UnsupportedOutput(output_shape));
        }

        let plan = optimized.into_runnable().map_err(runtime)?;

        let shapes = ModelShapes {
            input: input_shape,
            output: output_shape,
        };

        info!(model = %name, input_shape = ?shapes.input, "Input shape");
        info!(model = %name, output_shape = ?shapes.output, "Output shape");
        info!(model = %name, bytes = model_bytes.len(), "Model loaded successfully");

        Ok(LoadedModel {
            name: name.to_string(),
            plan,
            shapes,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(224, 224)
    }
}

/// Whether every dimension but the last is 1
fn is_score_vector(shape: &[usize]) -> bool {
    match shape.split_last() {
        Some((&classes, leading)) => classes > 0 && leading.iter().all(|&d| d == 1),
        None => false,
    }
}

/// Locate the TFLite FlatBuffer inside `buf`.
///
/// The identifier sits four bytes into the buffer; anything before that
/// (e.g. a container header) is skipped.
pub fn find_tflite_slice(buf: &[u8]) -> Option<&[u8]> {
    if buf.len() < 8 {
        return None;
    }
    (0..=buf.len() - 8)
        .find(|&i| &buf[i + 4..i + 8] == TFLITE_IDENTIFIER)
        .map(|i| &buf[i..])
}
