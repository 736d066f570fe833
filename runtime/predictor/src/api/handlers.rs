use axum::{
    body::Bytes,
    extract::State,
    response::Json,
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::features::{PredictionInput, FEATURE_COUNT};
use crate::service::PredictionResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model: String,
    kind: String,
    features: usize,
}

/// The body is read raw so that every malformed payload maps to a 400 with a
/// `detail` message instead of the extractor's own rejection.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let input = PredictionInput::from_json_slice(&body)?;
    let result = state.predictor.predict(&input)?;

    info!(
        probability = result.probability,
        risk = %result.risk,
        prediction = result.prediction,
        "Prediction served"
    );

    Ok(Json(result))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.predictor.model();
    Json(HealthResponse {
        status: "ok",
        model: model.name.clone(),
        kind: model.classifier.kind().to_string(),
        features: FEATURE_COUNT,
    })
}
