//! Inference path: raw request record in, labelled prediction out.
//!
//! A [`Predictor`] is built once from a loaded artifact and never mutated,
//! so it can be cloned into any number of request handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::artifact::{Artifact, ArtifactError, ModelSpec};
use crate::encode::{self, Coerced, DropPolicy, EncodeError};
use crate::frame::{Cell, Column, Frame};
use crate::ml::{Classifier, ModelError};
use crate::schema::{FEATURES, FieldKind, FieldSpec, binary_code, categorical_names};

/// Raw field values of one prediction request, keyed by canonical name.
pub type RequestRecord = BTreeMap<String, String>;

/// What is wrong with one request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    NotANumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(f, "'{}' is missing", self.field),
            FieldProblem::NotANumber(value) => {
                write!(f, "'{}' is not a number ('{value}')", self.field)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid input: {}", join_errors(.0))]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model returned {0} class probabilities, expected 2")]
    ClassCount(usize),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Binary outcome shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PossibleHeartDisease,
    NoHeartDisease,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::PossibleHeartDisease => "POSSIBLE HEART DISEASE",
            Outcome::NoHeartDisease => "NO HEART DISEASE DETECTED",
        }
    }

    /// Display color for the result banner.
    pub fn color(self) -> &'static str {
        match self {
            Outcome::PossibleHeartDisease => "#dc3545",
            Outcome::NoHeartDisease => "#28a745",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub outcome: Outcome,
    /// Model probability of the positive (disease) class.
    pub probability_positive: f64,
}

impl Prediction {
    pub fn probability_negative(&self) -> f64 {
        1.0 - self.probability_positive
    }

    /// Probability of the outcome that was predicted.
    pub fn probability_of_outcome(&self) -> f64 {
        match self.outcome {
            Outcome::PossibleHeartDisease => self.probability_positive,
            Outcome::NoHeartDisease => self.probability_negative(),
        }
    }

    pub fn message(&self) -> String {
        let risk = match self.outcome {
            Outcome::PossibleHeartDisease => "high",
            Outcome::NoHeartDisease => "low",
        };
        format!(
            "Based on the inputs, the model predicts a {risk} risk of heart disease (Probability: {:.2}%).",
            self.probability_of_outcome() * 100.0
        )
    }
}

/// Immutable inference state: the model and the feature columns it consumes.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Classifier>,
    features: Arc<[String]>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("n_features", &self.features.len())
            .finish_non_exhaustive()
    }
}

impl Predictor {
    pub fn new(model: Arc<dyn Classifier>, features: Vec<String>) -> Result<Self, ArtifactError> {
        if model.n_features() != features.len() {
            return Err(ArtifactError::Invalid(format!(
                "model expects {} features but the list has {}",
                model.n_features(),
                features.len()
            )));
        }
        Ok(Self {
            model,
            features: features.into(),
        })
    }

    pub fn from_artifact(artifact: Artifact) -> Result<Self, ArtifactError> {
        artifact.validate()?;
        let model: Arc<dyn Classifier> = match artifact.model {
            ModelSpec::RandomForest(forest) => Arc::new(forest),
        };
        Self::new(model, artifact.features)
    }

    /// Load the artifact at `path` and build a predictor from it.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        Self::from_artifact(Artifact::load(path)?)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Validate, encode and align a request into the model's input vector.
    pub fn encode(&self, record: &RequestRecord) -> Result<Vec<f64>, PredictError> {
        let frame = request_frame(record)?;
        let encoded = encode::one_hot(frame, &categorical_names(), DropPolicy::KeepAll)?;
        Ok(encode::align(&encoded, 0, &self.features))
    }

    pub fn predict(&self, record: &RequestRecord) -> Result<Prediction, PredictError> {
        let row = self.encode(record)?;
        let class = self.model.predict(&row)?;
        let proba = self.model.predict_proba(&row)?;
        if proba.len() != 2 {
            return Err(PredictError::ClassCount(proba.len()));
        }
        let outcome = if class == 1 {
            Outcome::PossibleHeartDisease
        } else {
            Outcome::NoHeartDisease
        };
        Ok(Prediction {
            outcome,
            probability_positive: proba[1],
        })
    }
}

/// Check a request against the schema and build its single-row frame.
///
/// All problems are collected so the caller can report them together.
pub fn request_frame(record: &RequestRecord) -> Result<Frame, PredictError> {
    let mut errors = Vec::new();
    let mut columns = Vec::with_capacity(FEATURES.len());
    for spec in &FEATURES {
        let raw = record.get(spec.name).map(String::as_str).unwrap_or("");
        match field_cell(spec, raw) {
            Ok(cell) => columns.push(Column::new(spec.name, vec![cell])),
            Err(problem) => errors.push(FieldError {
                field: spec.name,
                problem,
            }),
        }
    }
    if !errors.is_empty() {
        return Err(PredictError::Invalid(errors));
    }
    Frame::new(columns).map_err(|err| PredictError::Encode(err.into()))
}

fn field_cell(spec: &FieldSpec, raw: &str) -> Result<Cell, FieldProblem> {
    match spec.kind {
        FieldKind::CategoricalCode => match Cell::parse(raw) {
            Cell::Missing => Err(FieldProblem::Missing),
            cell => Ok(cell),
        },
        FieldKind::Binary => match encode::coerce(raw) {
            Coerced::Number(value) => Ok(Cell::Number(value)),
            Coerced::Missing => Err(FieldProblem::Missing),
            Coerced::Unparseable(text) => binary_code(&text)
                .map(Cell::Number)
                .ok_or(FieldProblem::NotANumber(text)),
        },
        FieldKind::Numeric => match encode::coerce(raw) {
            Coerced::Number(value) => Ok(Cell::Number(value)),
            Coerced::Missing => Err(FieldProblem::Missing),
            Coerced::Unparseable(text) => Err(FieldProblem::NotANumber(text)),
        },
    }
}
