//! Loading and evaluating the exported classifier.
//!
//! A model artifact is a JSON document produced from the fitted estimator.
//! Once loaded it is immutable and shared across all requests.

pub mod forest;
pub mod logistic;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::features::{FEATURE_COUNT, FEATURE_ORDER};
use forest::RandomForest;
use logistic::LogisticRegression;

/// Failure while evaluating a loaded model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Feature {index} is not a finite number")]
    NonFiniteInput { index: usize },

    #[error("Model produced an invalid output: {0}")]
    InvalidOutput(String),
}

impl ModelError {
    /// Whether the failure is attributable to the input vector.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            ModelError::DimensionMismatch { .. } | ModelError::NonFiniteInput { .. }
        )
    }
}

/// Failure while loading a model at startup.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Failed to read model file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model: {0}")]
    Invalid(String),
}

/// A fitted binary classifier.
pub trait Classifier: Send + Sync {
    /// Kind of estimator, for logs
    fn kind(&self) -> &str;

    /// Number of input features the estimator was fitted on
    fn n_features(&self) -> usize;

    /// Class probabilities `[negative, positive]` for one sample
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError>;
}

pub(crate) fn check_input(features: &[f64], expected: usize) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: features.len(),
        });
    }
    match features.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(ModelError::NonFiniteInput { index }),
        None => Ok(()),
    }
}

pub(crate) fn ensure_finite(values: &[f64], what: &str) -> Result<(), ModelLoadError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelLoadError::Invalid(format!("{what} contains non-finite values")))
    }
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    model: Estimator,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Estimator {
    #[serde(rename = "logistic_regression")]
    LogisticRegression(LogisticRegression),
    #[serde(rename = "random_forest")]
    RandomForest(RandomForest),
}

/// A model ready to serve, with the metadata it was exported with.
pub struct LoadedModel {
    pub name: String,
    pub classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("kind", &self.classifier.kind())
            .field("n_features", &self.classifier.n_features())
            .finish()
    }
}

impl LoadedModel {
    pub fn new(name: impl Into<String>, classifier: Box<dyn Classifier>) -> Self {
        Self {
            name: name.into(),
            classifier,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        info!("Loading model from {:?}", path);

        let content = fs::read_to_string(path).map_err(|source| ModelLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        let model = Self::from_json(&content, &name).map_err(|e| match e {
            ModelLoadError::Parse { source, .. } => ModelLoadError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!(
            "Model '{}' loaded ({}, {} features)",
            model.name,
            model.classifier.kind(),
            model.classifier.n_features()
        );
        Ok(model)
    }

    /// Parses and validates an artifact. `fallback_name` is used when the
    /// artifact does not carry one.
    pub fn from_json(content: &str, fallback_name: &str) -> Result<Self, ModelLoadError> {
        let artifact: ModelArtifact =
            serde_json::from_str(content).map_err(|source| ModelLoadError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        if let Some(names) = &artifact.feature_names {
            if names.iter().map(String::as_str).ne(FEATURE_ORDER.iter().copied()) {
                return Err(ModelLoadError::Invalid(format!(
                    "feature_names {:?} do not match the expected order {:?}",
                    names, FEATURE_ORDER
                )));
            }
        }

        let classifier: Box<dyn Classifier> = match artifact.model {
            Estimator::LogisticRegression(m) => {
                m.validate()?;
                Box::new(m)
            }
            Estimator::RandomForest(m) => {
                m.validate()?;
                Box::new(m)
            }
        };

        if classifier.n_features() != FEATURE_COUNT {
            warn!(
                "Model expects {} features but requests provide {}; predictions will be rejected",
                classifier.n_features(),
                FEATURE_COUNT
            );
        }

        let name = artifact.name.unwrap_or_else(|| fallback_name.to_string());
        Ok(Self::new(name, classifier))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Always returns the same positive-class probability.
    pub(crate) struct FixedProbability(pub f64);

    impl Classifier for FixedProbability {
        fn kind(&self) -> &str {
            "fixed"
        }

        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
            check_input(features, FEATURE_COUNT)?;
            Ok([1.0 - self.0, self.0])
        }
    }

    pub(crate) const LOGISTIC_JSON: &str = r#"{
        "name": "test-logit",
        "feature_names": ["age", "gender", "educationyears", "Global", "EF", "PS",
            "glucose_min", "cholesterol_total", "hypertension_sys", "smoking",
            "Fazekas", "lacunes_num", "SVD_Simple_Score", "CMB_count"],
        "model": {
            "type": "logistic_regression",
            "coefficients": [0.05, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            "intercept": -3.5
        }
    }"#;

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LOGISTIC_JSON.as_bytes()).unwrap();

        let model = LoadedModel::load(file.path()).unwrap();
        assert_eq!(model.name, "test-logit");
        assert_eq!(model.classifier.kind(), "logistic_regression");
        assert_eq!(model.classifier.n_features(), FEATURE_COUNT);
    }

    #[test]
    fn name_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelo_demencia.json");
        fs::write(
            &path,
            r#"{"model": {"type": "logistic_regression", "coefficients": [1.0], "intercept": 0.0}}"#,
        )
        .unwrap();
        assert_eq!(LoadedModel::load(&path).unwrap().name, "modelo_demencia");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedModel::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Read { .. }));
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a serialized model").unwrap();
        let err = LoadedModel::load(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { ref path, .. } if path == file.path()));

        let err = LoadedModel::from_json(r#"{"model": {"type": "svm"}}"#, "m").unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { .. }));
    }

    #[test]
    fn reordered_feature_names_are_rejected() {
        let swapped = LOGISTIC_JSON.replacen("\"age\", \"gender\"", "\"gender\", \"age\"", 1);
        let err = LoadedModel::from_json(&swapped, "m").unwrap_err();
        assert!(matches!(err, ModelLoadError::Invalid(_)));
    }

    #[test]
    fn narrower_model_loads_but_rejects_requests() {
        let model = LoadedModel::from_json(
            r#"{"model": {"type": "logistic_regression", "coefficients": [1.0, 2.0], "intercept": 0.0}}"#,
            "m",
        )
        .unwrap();
        let err = model.classifier.predict_proba(&[0.0; FEATURE_COUNT]).unwrap_err();
        assert_eq!(
            err,
            ModelError::DimensionMismatch {
                expected: 2,
                got: FEATURE_COUNT
            }
        );
        assert!(err.is_value_error());
    }

    #[test]
    fn non_finite_input_is_a_value_error() {
        let mut features = [0.0; FEATURE_COUNT];
        features[3] = f64::NAN;
        let err = check_input(&features, FEATURE_COUNT).unwrap_err();
        assert_eq!(err, ModelError::NonFiniteInput { index: 3 });
        assert!(err.is_value_error());
        assert!(!ModelError::InvalidOutput("x".into()).is_value_error());
    }
}
