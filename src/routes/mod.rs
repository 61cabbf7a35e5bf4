mod health;
mod predict;
mod predict_base64;
mod root;

use crate::model::ModelHandle;
use crate::predictor::{PredictError, Prediction};
use crate::server::SharedState;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

pub fn api_routes<M: ModelHandle>() -> Router<SharedState<M>> {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health::<M>))
        .route("/predict", post(predict::predict::<M>))
        .route("/predict-base64", post(predict_base64::predict_base64::<M>))
}

/// Success/error envelope shared by both prediction endpoints. Errors are
/// reported in-band with HTTP 200, matching the contract the frontend
/// consumes.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PredictResponse {
    pub fn success(prediction: Prediction) -> Self {
        Self {
            success: true,
            prediction: Some(prediction),
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            prediction: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<Prediction, PredictError>> for PredictResponse {
    fn from(result: Result<Prediction, PredictError>) -> Self {
        match result {
            Ok(prediction) => Self::success(prediction),
            Err(e) => Self::failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::RankedLabel;

    #[test]
    fn success_envelope_omits_error_field() {
        let prediction = Prediction {
            gardiner_code: "G39".to_string(),
            confidence: 0.75,
            top_5: vec![RankedLabel {
                gardiner_code: "G39".to_string(),
                confidence: 0.75,
            }],
        };

        let value = serde_json::to_value(PredictResponse::success(prediction)).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["prediction"]["gardiner_code"], "G39");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failure_envelope_carries_the_error_string() {
        let value = serde_json::to_value(PredictResponse::failure("failed to decode image")).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "failed to decode image");
        assert!(value.get("prediction").is_none());
    }
}
