//! Request schema for the prediction endpoint.
//!
//! The wire names below are the column names the model was fitted on. Their
//! order in [`FEATURE_ORDER`] is the order of the model's input vector.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const FEATURE_COUNT: usize = 14;

/// Wire names in model input order. Never reorder.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "educationyears",
    "Global",
    "EF",
    "PS",
    "glucose_min",
    "cholesterol_total",
    "hypertension_sys",
    "smoking",
    "Fazekas",
    "lacunes_num",
    "SVD_Simple_Score",
    "CMB_count",
];

/// Clinical and demographic features of one patient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PredictionInput {
    pub age: f64,
    pub gender: f64,
    pub education_years: f64,
    pub global_cognition: f64,
    pub executive_function: f64,
    pub processing_speed: f64,
    pub glucose_min: f64,
    pub cholesterol_total: f64,
    pub hypertension_sys: f64,
    pub smoking: f64,
    pub fazekas: f64,
    pub lacunes: f64,
    pub svd_score: f64,
    pub microbleeds: f64,
}

type Slot = fn(&mut PredictionInput) -> &mut f64;

/// External name, its space-separated alias, and the struct field it fills.
/// Checked exhaustively on every request. When a body carries both spellings
/// the underscore name wins.
const SCHEMA: [(&str, Option<&str>, Slot); FEATURE_COUNT] = [
    ("age", None, |i| &mut i.age),
    ("gender", None, |i| &mut i.gender),
    ("educationyears", None, |i| &mut i.education_years),
    ("Global", None, |i| &mut i.global_cognition),
    ("EF", None, |i| &mut i.executive_function),
    ("PS", None, |i| &mut i.processing_speed),
    ("glucose_min", Some("glucose min"), |i| &mut i.glucose_min),
    ("cholesterol_total", Some("cholesterol total"), |i| &mut i.cholesterol_total),
    ("hypertension_sys", Some("hypertension sys"), |i| &mut i.hypertension_sys),
    ("smoking", None, |i| &mut i.smoking),
    ("Fazekas", None, |i| &mut i.fazekas),
    ("lacunes_num", Some("lacunes num"), |i| &mut i.lacunes),
    ("SVD_Simple_Score", Some("SVD Simple Score"), |i| &mut i.svd_score),
    ("CMB_count", Some("CMB count"), |i| &mut i.microbleeds),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    Missing,
    Null,
    NotNumeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub issue: FieldIssue,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issue {
            FieldIssue::Missing => write!(f, "El campo '{}' es obligatorio", self.field),
            FieldIssue::Null => write!(f, "El campo '{}' no puede ser nulo", self.field),
            FieldIssue::NotNumeric => {
                write!(f, "El campo '{}' debe ser un número válido", self.field)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("El cuerpo de la petición no es JSON válido: {0}")]
    MalformedBody(String),

    #[error("El cuerpo de la petición debe ser un objeto JSON")]
    NotAnObject,

    #[error("{}", join_fields(.0))]
    Fields(Vec<FieldError>),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::Fields(errors) => errors.iter().map(|e| e.field).collect(),
            _ => Vec::new(),
        }
    }
}

impl PredictionInput {
    pub fn from_json_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
        match value {
            Value::Object(map) => Self::from_object(&map),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Every field is checked so the caller sees all problems at once.
    /// Keys outside the schema are ignored.
    pub fn from_object(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut input = PredictionInput::default();
        let mut errors = Vec::new();

        for (field, alias, slot) in SCHEMA {
            let value = map
                .get(field)
                .or_else(|| alias.and_then(|a| map.get(a)));
            match value.map(coerce) {
                Some(Ok(v)) => *slot(&mut input) = v,
                Some(Err(issue)) => errors.push(FieldError { field, issue }),
                None => errors.push(FieldError {
                    field,
                    issue: FieldIssue::Missing,
                }),
            }
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(ValidationError::Fields(errors))
        }
    }

    /// Model input vector, in [`FEATURE_ORDER`].
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.gender,
            self.education_years,
            self.global_cognition,
            self.executive_function,
            self.processing_speed,
            self.glucose_min,
            self.cholesterol_total,
            self.hypertension_sys,
            self.smoking,
            self.fazekas,
            self.lacunes,
            self.svd_score,
            self.microbleeds,
        ]
    }
}

fn coerce(value: &Value) -> Result<f64, FieldIssue> {
    let number = match value {
        Value::Null => return Err(FieldIssue::Null),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or(FieldIssue::NotNumeric)
}
