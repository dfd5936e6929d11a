//! `POST /predict`

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument, Span};
use uuid::Uuid;

use super::AppState;
use crate::error::PredictError;
use crate::types::{ImagePayload, PredictionResponse, PredictionResult};

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

pub async fn predict(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<PredictionResponse>, PredictError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", request_id = %request_id);
    let start = Instant::now();

    match run_prediction(&state, request).instrument(span.clone()).await {
        Ok(result) => {
            let latency = start.elapsed();
            state.metrics.record_success(latency, &result.prediction.name);
            span.in_scope(|| {
                info!(
                    prediction = %result.prediction.name,
                    confidence = result.prediction.confidence,
                    latency_us = latency.as_micros() as u64,
                    "Prediction served"
                )
            });
            Ok(Json(result.into()))
        }
        Err(err) => {
            state.metrics.record_failure(err.kind());
            span.in_scope(|| {
                if err.is_client_error() {
                    warn!(error = %err, "Rejected prediction request");
                } else {
                    error!(error = %err, detail = ?err, "Prediction error");
                }
            });
            Err(err)
        }
    }
}

async fn run_prediction(
    state: &AppState,
    request: Request,
) -> Result<PredictionResult, PredictError> {
    let model = state.model.clone().ok_or(PredictError::ModelUnavailable)?;
    let payload = extract_payload(request).await?;
    debug!(
        model = model.name(),
        encoding = payload.encoding(),
        "Image payload received"
    );

    let pipeline = state.pipeline.clone();
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| pipeline.run(&*model, payload)))
        .await
        .map_err(|e| PredictError::Internal(format!("prediction task failed: {e}")))?
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Pull the image out of a multipart `image` field or a JSON `image` string.
pub async fn extract_payload(request: Request) -> Result<ImagePayload, PredictError> {
    if is_multipart(request.headers()) {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| PredictError::InvalidRequest {
                status: e.status(),
                message: e.body_text(),
            })?;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() == Some(IMAGE_FIELD) {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                return Ok(ImagePayload::Raw(bytes.to_vec()));
            }
        }
        return Err(PredictError::MissingImage);
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| PredictError::InvalidRequest {
            status: e.status(),
            message: e.body_text(),
        })?;
    ImagePayload::from_json_body(&body)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> PredictError {
    PredictError::InvalidRequest {
        status: err.status(),
        message: err.body_text(),
    }
}
