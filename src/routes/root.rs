use axum::{response::Json, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
pub struct ServiceInfo {
    message: String,
    status: String,
}

pub async fn root() -> impl IntoResponse {
    Json(ServiceInfo {
        message: "Hieroglyph classification service".into(),
        status: "running".into(),
    })
}
