use super::PredictResponse;
use crate::model::ModelHandle;
use crate::server::SharedState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::instrument;

/// Multipart upload endpoint. The image travels as the `file` field; every
/// per-request failure is folded into the envelope rather than a status
/// code.
#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelHandle>(
    State(state): State<SharedState<M>>,
    mut multipart: Multipart,
) -> Json<PredictResponse> {
    let image_bytes = match read_file_field(&mut multipart).await {
        Ok(bytes) => bytes,
        Err(message) => return Json(PredictResponse::failure(message)),
    };

    Json(state.predictor.predict(&image_bytes).into())
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("failed to read multipart field: {}", e))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| format!("failed to read uploaded file: {}", e));
        }
    }

    Err("no `file` field in multipart request".to_string())
}
