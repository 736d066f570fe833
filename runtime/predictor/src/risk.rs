use serde::{Serialize, Serializer};
use std::fmt;

pub const DECISION_THRESHOLD: f64 = 0.5;
pub const HIGH_RISK_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    /// Bands are checked from high to low; the first match wins.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else if probability >= DECISION_THRESHOLD {
            RiskBand::Moderate
        } else {
            RiskBand::Low
        }
    }

    /// Wire label, also used for display.
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Low => "Bajo",
            RiskBand::Moderate => "Moderado",
            RiskBand::High => "Alto",
        }
    }
}

impl Serialize for RiskBand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn decision(probability: f64) -> u8 {
    u8::from(probability >= DECISION_THRESHOLD)
}

/// Four decimal places, kept inside [0, 1].
///
/// Rounds the exact stored value rather than a scaled product, so inputs just
/// below a `.xxxx5` midpoint round down and exact ties go to even.
pub fn round_probability(probability: f64) -> f64 {
    format!("{probability:.4}")
        .parse::<f64>()
        .unwrap_or(probability)
        .clamp(0.0, 1.0)
}
