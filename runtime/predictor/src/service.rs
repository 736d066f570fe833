use serde::Serialize;

use crate::error::ApiError;
use crate::features::PredictionInput;
use crate::model::LoadedModel;
use crate::risk::{decision, round_probability, RiskBand};

/// Index of the "has dementia risk" class in the model output.
const POSITIVE_CLASS: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "probabilidad_demencia")]
    pub probability: f64,
    #[serde(rename = "riesgo")]
    pub risk: RiskBand,
    #[serde(rename = "prediccion")]
    pub prediction: u8,
    pub status: &'static str,
}

/// Owns the loaded model for the lifetime of the process.
#[derive(Debug)]
pub struct Predictor {
    model: LoadedModel,
}

impl Predictor {
    pub fn new(model: LoadedModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ApiError> {
        let features = input.to_features();
        let proba = self.model.classifier.predict_proba(&features)?;

        let raw = proba[POSITIVE_CLASS];
        if !(0.0..=1.0).contains(&raw) {
            return Err(ApiError::Internal(format!(
                "positive class probability {raw} outside [0, 1]"
            )));
        }

        // Band and decision use the published value so both agree with it.
        let probability = round_probability(raw);
        Ok(PredictionResult {
            probability,
            risk: RiskBand::from_probability(probability),
            prediction: decision(probability),
            status: "success",
        })
    }
}
