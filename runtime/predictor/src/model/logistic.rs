use serde::Deserialize;

use super::{check_input, ensure_finite, Classifier, ModelError, ModelLoadError};

/// Standardization fitted alongside the estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl LogisticRegression {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.coefficients.is_empty() {
            return Err(ModelLoadError::Invalid("logistic regression has no coefficients".into()));
        }
        ensure_finite(&self.coefficients, "coefficients")?;
        ensure_finite(&[self.intercept], "intercept")?;

        if let Some(scaler) = &self.scaler {
            let n = self.coefficients.len();
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(ModelLoadError::Invalid(format!(
                    "scaler has {} means and {} scales for {} coefficients",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
            ensure_finite(&scaler.mean, "scaler mean")?;
            ensure_finite(&scaler.scale, "scaler scale")?;
            if scaler.scale.iter().any(|s| *s == 0.0) {
                return Err(ModelLoadError::Invalid("scaler scale contains zeros".into()));
            }
        }
        Ok(())
    }

    fn decision_function(&self, features: &[f64]) -> f64 {
        let linear: f64 = match &self.scaler {
            Some(scaler) => self
                .coefficients
                .iter()
                .zip(features)
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|((w, x), (m, s))| w * (x - m) / s)
                .sum(),
            None => self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum(),
        };
        linear + self.intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
        check_input(features, self.n_features())?;
        let z = self.decision_function(features);
        if z.is_nan() {
            return Err(ModelError::InvalidOutput("decision function is NaN".into()));
        }
        let p = sigmoid(z);
        Ok([1.0 - p, p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(coefficients: Vec<f64>, intercept: f64) -> LogisticRegression {
        LogisticRegression {
            coefficients,
            intercept,
            scaler: None,
        }
    }

    #[test]
    fn zero_logit_is_even_odds() {
        let m = model(vec![1.0, -1.0], 0.0);
        let [neg, pos] = m.predict_proba(&[2.0, 2.0]).unwrap();
        assert_eq!(pos, 0.5);
        assert_eq!(neg, 0.5);
    }

    #[test]
    fn probability_follows_sigmoid() {
        let m = model(vec![0.5], -1.0);
        let [_, pos] = m.predict_proba(&[4.0]).unwrap();
        let expected = 1.0 / (1.0 + (-1.0f64).exp());
        assert!((pos - expected).abs() < 1e-12);
    }

    #[test]
    fn extreme_logits_stay_in_range() {
        let m = model(vec![1.0], 0.0);
        let [_, high] = m.predict_proba(&[1e6]).unwrap();
        let [_, low] = m.predict_proba(&[-1e6]).unwrap();
        assert_eq!(high, 1.0);
        assert_eq!(low, 0.0);
    }

    #[test]
    fn scaler_is_applied_before_coefficients() {
        let m = LogisticRegression {
            coefficients: vec![2.0],
            intercept: 0.0,
            scaler: Some(StandardScaler {
                mean: vec![10.0],
                scale: vec![5.0],
            }),
        };
        let [_, pos] = m.predict_proba(&[10.0]).unwrap();
        assert_eq!(pos, 0.5);
        let [_, pos] = m.predict_proba(&[15.0]).unwrap();
        assert!((pos - sigmoid(2.0)).abs() < 1e-12);
    }

    #[test]
    fn validation_catches_bad_scalers() {
        let mut m = model(vec![1.0, 1.0], 0.0);
        m.scaler = Some(StandardScaler {
            mean: vec![0.0],
            scale: vec![1.0, 1.0],
        });
        assert!(m.validate().is_err());

        m.scaler = Some(StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 0.0],
        });
        assert!(m.validate().is_err());

        assert!(model(vec![], 0.0).validate().is_err());
        assert!(model(vec![f64::INFINITY], 0.0).validate().is_err());
    }
}
