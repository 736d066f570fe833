use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::features::ValidationError;
use crate::model::ModelError;

/// Every way a prediction request can fail.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error en los datos de entrada: {0}")]
    InferenceValue(ModelError),

    #[error("Error interno: {0}")]
    Internal(String),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        if e.is_value_error() {
            ApiError::InferenceValue(e)
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InferenceValue(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        match &self {
            ApiError::Validation(e) => {
                tracing::debug!(fields = ?e.fields(), "Rejected request: {}", detail)
            }
            ApiError::InferenceValue(_) => tracing::warn!("Model rejected input: {}", detail),
            ApiError::Internal(_) => tracing::error!("Prediction failed: {}", detail),
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
