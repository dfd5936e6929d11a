//! Per-request error taxonomy and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Everything that can end a single prediction request.
///
/// Each pipeline stage returns one of these; none of them affect later
/// requests.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The request carried no usable image
    #[error("No image provided")]
    MissingImage,

    /// The HTTP layer rejected the request body
    #[error("{message}")]
    InvalidRequest { status: StatusCode, message: String },

    /// Startup failed to load the model
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Input tensor shape {actual:?} does not match model input {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model produced {actual} scores but {expected} classes are configured")]
    ClassCountMismatch { expected: usize, actual: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PredictError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::MissingImage => StatusCode::BAD_REQUEST,
            PredictError::InvalidRequest { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, stable name used as a metrics key
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingImage => "missing_image",
            PredictError::InvalidRequest { .. } => "invalid_request",
            PredictError::ModelUnavailable => "model_unavailable",
            PredictError::Base64(_) => "base64",
            PredictError::Decode(_) => "decode",
            PredictError::ShapeMismatch { .. } => "shape_mismatch",
            PredictError::Inference(_) => "inference",
            PredictError::ClassCountMismatch { .. } => "class_count_mismatch",
            PredictError::Internal(_) => "internal",
        }
    }

    /// Whether the caller, rather than the server, is at fault
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PredictError::MissingImage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PredictError::ModelUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PredictError::Inference("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let rejected = PredictError::InvalidRequest {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "too big".into(),
        };
        assert_eq!(rejected.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(rejected.is_client_error());
    }

    #[test]
    fn test_messages_match_wire_format() {
        assert_eq!(PredictError::MissingImage.to_string(), "No image provided");
        assert_eq!(PredictError::ModelUnavailable.to_string(), "Model not loaded");
        assert_eq!(
            PredictError::ClassCountMismatch {
                expected: 9,
                actual: 4
            }
            .to_string(),
            "Model produced 4 scores but 9 classes are configured"
        );
    }
}
