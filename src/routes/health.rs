use crate::model::ModelHandle;
use crate::server::SharedState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    model_loaded: bool,
    device: String,
    num_classes: usize,
}

/// Liveness/readiness probe reflecting the injected model handle. The
/// listener is only bound after a successful load, so a serving process
/// always reports `model_loaded: true`.
pub async fn health<M: ModelHandle>(State(state): State<SharedState<M>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        model_loaded: state.predictor.model_loaded(),
        device: state.predictor.device().as_str().into(),
        num_classes: state.predictor.num_classes(),
    })
}
