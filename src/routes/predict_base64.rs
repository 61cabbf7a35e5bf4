use super::PredictResponse;
use crate::model::ModelHandle;
use crate::server::SharedState;
use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct Base64Request {
    image: Option<String>,
}

/// JSON endpoint accepting `{"image": "<base64 or data-URL>"}`. Semantics
/// match `/predict`; only the transport encoding differs.
#[instrument(skip(state, request))]
pub async fn predict_base64<M: ModelHandle>(
    State(state): State<SharedState<M>>,
    Json(request): Json<Base64Request>,
) -> Json<PredictResponse> {
    let Some(image) = request.image else {
        return Json(PredictResponse::failure("missing `image` field"));
    };

    let image_bytes = match STANDARD.decode(strip_data_url(&image)) {
        Ok(bytes) => bytes,
        Err(e) => return Json(PredictResponse::failure(format!("invalid base64 image: {}", e))),
    };

    Json(state.predictor.predict(&image_bytes).into())
}

/// Drops a `data:image/...;base64,` prefix, keeping everything after the
/// first comma.
fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        payload
            .split_once(',')
            .map(|(_, rest)| rest)
            .unwrap_or(payload)
    } else {
        payload
    }
}
