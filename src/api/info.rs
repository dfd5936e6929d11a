use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub num_classes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassesResponse {
    pub classes: Vec<String>,
    pub num_classes: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.model_loaded(),
        num_classes: state.pipeline.labels().len(),
    })
}

pub async fn classes(State(state): State<AppState>) -> Json<ClassesResponse> {
    let labels = state.pipeline.labels();
    Json(ClassesResponse {
        classes: labels.as_slice().to_vec(),
        num_classes: labels.len(),
    })
}
