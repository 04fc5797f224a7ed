//! Offline training pipeline: CSV in, artifact out.
//!
//! Stages run in a fixed order and every failure aborts before fitting:
//! load, reconcile column names, validate and clean, encode, split, fit,
//! evaluate.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::{Artifact, ModelSpec, TrainingSummary};
use crate::encode::{self, DropPolicy, EncodeError};
use crate::frame::{Cell, Frame, FrameError};
use crate::ml::ModelError;
use crate::ml::forest::{ForestOptions, TrainDataset, train_forest};
use crate::ml::metrics::{Evaluation, evaluate};
use crate::reconcile::{ColumnMapping, ReconcileError, reconcile};
use crate::schema::{FEATURES, FieldKind, TARGET, binary_names, categorical_names};

/// Class identifiers stored in the model; index 1 is the positive class.
pub const CLASSES: [&str; 2] = ["no_disease", "disease"];

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Data(#[from] FrameError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("Column '{column}' row {row} is not numeric: '{value}'")]
    InvalidNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("No usable records left after dropping {dropped} rows with missing values")]
    NoRecords { dropped: usize },
    #[error("Training data contains a single label class ({present}); need both outcomes")]
    SingleClass { present: &'static str },
    #[error("test_fraction must be in [0, 1), got {0}")]
    InvalidSplit(f64),
    #[error("Model fitting failed: {0}")]
    Fit(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Options for one training run.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub data_path: PathBuf,
    /// Share of cleaned rows held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub split_seed: u64,
    pub forest: ForestOptions,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("heart.csv"),
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestOptions::default(),
        }
    }
}

/// Cleaned, encoded training data.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    /// Encoded column names, in model order.
    pub features: Vec<String>,
    /// Feature matrix, row-major, aligned with `features`.
    pub x: Vec<Vec<f64>>,
    /// Binary labels (1 = disease present).
    pub y: Vec<usize>,
    /// Columns renamed during reconciliation.
    pub mappings: Vec<ColumnMapping>,
    /// Rows dropped for missing values.
    pub dropped: usize,
}

/// Outcome of a training run; the caller decides where to persist it.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub artifact: Artifact,
    pub evaluation: Option<Evaluation>,
}

/// Reconcile, validate, clean and encode a raw training table.
pub fn prepare_dataset(frame: Frame) -> Result<EncodedDataset, TrainError> {
    let reconciled = reconcile(frame)?;
    let mut frame = reconciled.frame;

    for field in binary_names() {
        let rewritten = encode::normalize_binary(&mut frame, field)?;
        if rewritten > 0 {
            info!("Encoded text labels of '{field}' as 1/0 in {rewritten} rows");
        }
    }
    validate_numeric(&frame)?;

    let keep: Vec<bool> = (0..frame.n_rows())
        .map(|row| frame.columns().iter().all(|col| !col.cells[row].is_missing()))
        .collect();
    let dropped = keep.iter().filter(|&&flag| !flag).count();
    frame.retain_rows(&keep);
    if dropped > 0 {
        warn!("Dropped {dropped} rows with missing values");
    }
    if frame.n_rows() == 0 {
        return Err(TrainError::NoRecords { dropped });
    }

    let target = frame
        .remove(TARGET.name)
        .ok_or(ReconcileError::MissingTargetColumn {
            target: TARGET.name,
            aliases: TARGET.aliases,
        })?;
    let y: Vec<usize> = target
        .cells
        .iter()
        .map(|cell| usize::from(cell.as_number().unwrap_or(0.0) > 0.0))
        .collect();

    // Validation leaves text only in categorical-code columns.
    let encode_fields = categorical_names();
    let frame = encode::one_hot(frame, &encode_fields, DropPolicy::DropFirst)?;
    info!("Applied one-hot encoding to {}", encode_fields.join(", "));

    let features: Vec<String> = frame
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let x = (0..frame.n_rows())
        .map(|row| encode::align(&frame, row, &features))
        .collect();

    Ok(EncodedDataset {
        features,
        x,
        y,
        mappings: reconciled.mappings,
        dropped,
    })
}

/// Numeric and binary fields (and the label) may only hold numbers or
/// missing markers; anything else is rejected instead of being coerced.
fn validate_numeric(frame: &Frame) -> Result<(), TrainError> {
    let numeric = FEATURES
        .iter()
        .filter(|spec| spec.kind != FieldKind::CategoricalCode)
        .map(|spec| spec.name)
        .chain([TARGET.name]);
    for name in numeric {
        let Some(col) = frame.column(name) else {
            continue;
        };
        if let Some((row, Cell::Text(value))) =
            col.cells.iter().enumerate().find(|(_, cell)| cell.is_text())
        {
            return Err(TrainError::InvalidNumeric {
                column: name.to_string(),
                row,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Shuffle row indices with `seed` and hold out `test_fraction` of them.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let train = indices.split_off(n_test);
    (train, indices)
}

fn subset(dataset: &EncodedDataset, indices: &[usize]) -> TrainDataset {
    TrainDataset {
        classes: CLASSES.iter().map(|c| c.to_string()).collect(),
        x: indices.iter().map(|&i| dataset.x[i].clone()).collect(),
        y: indices.iter().map(|&i| dataset.y[i]).collect(),
    }
}

/// Fit a forest on an already encoded dataset.
pub fn fit(dataset: &EncodedDataset, options: &TrainOptions) -> Result<TrainReport, TrainError> {
    if !(0.0..1.0).contains(&options.test_fraction) {
        return Err(TrainError::InvalidSplit(options.test_fraction));
    }
    let positives = dataset.y.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == dataset.y.len() {
        let present = if positives == 0 { CLASSES[0] } else { CLASSES[1] };
        return Err(TrainError::SingleClass { present });
    }

    let (train_idx, test_idx) =
        split_indices(dataset.x.len(), options.test_fraction, options.split_seed);
    let train = subset(dataset, &train_idx);
    let test = subset(dataset, &test_idx);
    info!(
        "Training model with {} records and {} features",
        train.x.len(),
        dataset.features.len()
    );
    let forest = train_forest(&train, &options.forest).map_err(TrainError::Fit)?;

    let evaluation = if test.x.is_empty() {
        None
    } else {
        let eval = evaluate(&forest, CLASSES.len(), &test.x, &test.y)?;
        info!("Model accuracy: {:.2}%", eval.accuracy * 100.0);
        Some(eval)
    };

    let mut artifact = Artifact::new(ModelSpec::RandomForest(forest), dataset.features.clone());
    artifact.training = Some(TrainingSummary {
        data_path: options.data_path.display().to_string(),
        records: dataset.x.len(),
        dropped_records: dataset.dropped,
        train_records: train.x.len(),
        test_records: test.x.len(),
        evaluation: evaluation.clone(),
    });
    Ok(TrainReport {
        artifact,
        evaluation,
    })
}

/// Run the whole pipeline on `options.data_path`.
pub fn run(options: &TrainOptions) -> Result<TrainReport, TrainError> {
    let frame = load(&options.data_path)?;
    let dataset = prepare_dataset(frame)?;
    fit(&dataset, options)
}

fn load(path: &Path) -> Result<Frame, TrainError> {
    let frame = Frame::from_csv_path(path)?;
    info!(
        "Dataset '{}' loaded: {} rows, {} columns",
        path.display(),
        frame.n_rows(),
        frame.columns().len()
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target";

    fn frame(rows: &[&str]) -> Frame {
        let data = format!("{HEADER}\n{}\n", rows.join("\n"));
        Frame::from_csv_reader(data.as_bytes()).unwrap()
    }

    #[test]
    fn text_sex_is_normalized_and_codes_are_encoded() {
        let dataset = prepare_dataset(frame(&[
            "63,Male,3,145,233,1,0,150,0,2.3,0,0,1,1",
            "41,Female,1,130,204,0,0,172,0,1.4,2,0,2,0",
            "56,M,1,120,236,0,1,178,0,0.8,2,0,2,0",
        ]))
        .unwrap();
        assert_eq!(
            dataset.features,
            vec![
                "age", "sex", "trestbps", "chol", "fbs", "thalach", "exang", "oldpeak", "cp_3",
                "restecg_1", "slope_2", "thal_2"
            ]
        );
        assert_eq!(dataset.x[0][1], 1.0);
        assert_eq!(dataset.x[1][1], 0.0);
        assert_eq!(dataset.y, vec![1, 0, 0]);
    }

    #[test]
    fn uci_layout_with_boolean_flags_trains() {
        let data = "id,age,sex,dataset,cp,trestbps,chol,fbs,restecg,thalch,exang,oldpeak,slope,ca,thal,num\n\
            1,63,Male,Cleveland,typical angina,145,233,TRUE,lv hypertrophy,150,FALSE,2.3,downsloping,0,fixed defect,0\n\
            2,67,Male,Cleveland,asymptomatic,160,286,FALSE,lv hypertrophy,108,TRUE,1.5,flat,3,normal,2\n\
            3,37,Female,Hungary,non-anginal,130,250,FALSE,normal,187,FALSE,3.5,,,,0\n";
        let dataset = prepare_dataset(Frame::from_csv_reader(data.as_bytes()).unwrap()).unwrap();
        assert_eq!(dataset.dropped, 1);
        assert_eq!(dataset.y, vec![0, 1]);
        let col = |name: &str| dataset.features.iter().position(|f| f == name).unwrap();
        assert_eq!(dataset.x[0][col("fbs")], 1.0);
        assert_eq!(dataset.x[0][col("exang")], 0.0);
        assert_eq!(dataset.x[1][col("exang")], 1.0);
        assert!(dataset.features.contains(&"cp_typical angina".to_string()));
        assert!(!dataset.features.iter().any(|f| f == "id" || f == "dataset"));
    }

    #[test]
    fn missing_markers_drop_rows() {
        let dataset = prepare_dataset(frame(&[
            "63,1,3,145,233,1,0,150,0,2.3,0,0,1,1",
            "41,0,1,130,204,0,0,172,0,1.4,2,?,2,0",
            "56,1,1,120,,0,1,178,0,0.8,2,0,2,0",
        ]))
        .unwrap();
        assert_eq!(dataset.dropped, 2);
        assert_eq!(dataset.x.len(), 1);
    }

    #[test]
    fn text_in_numeric_column_is_rejected() {
        let err = prepare_dataset(frame(&["63,1,3,high,233,1,0,150,0,2.3,0,0,1,1"])).unwrap_err();
        match err {
            TrainError::InvalidNumeric { column, row, value } => {
                assert_eq!(column, "trestbps");
                assert_eq!(row, 0);
                assert_eq!(value, "high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn text_categories_are_encoded() {
        let dataset = prepare_dataset(frame(&[
            "63,1,3,145,233,1,0,150,0,2.3,0,0,fixed defect,1",
            "41,0,1,130,204,0,0,172,0,1.4,2,0,normal,0",
        ]))
        .unwrap();
        assert!(dataset.features.contains(&"thal_normal".to_string()));
        assert!(!dataset.features.contains(&"thal_fixed defect".to_string()));
    }

    #[test]
    fn severity_labels_are_binarized() {
        let dataset = prepare_dataset(frame(&[
            "63,1,3,145,233,1,0,150,0,2.3,0,0,1,3",
            "41,0,1,130,204,0,0,172,0,1.4,2,0,2,0",
        ]))
        .unwrap();
        assert_eq!(dataset.y, vec![1, 0]);
    }

    #[test]
    fn all_missing_is_an_error() {
        let err = prepare_dataset(frame(&["?,1,3,145,233,1,0,150,0,2.3,0,0,1,1"])).unwrap_err();
        assert!(matches!(err, TrainError::NoRecords { dropped: 1 }));
    }

    #[test]
    fn split_holds_out_requested_share() {
        let (train, test) = split_indices(10, 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        let mut all: Vec<_> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert_eq!(split_indices(10, 0.2, 42), (train, test));
    }

    #[test]
    fn single_class_cannot_be_fit() {
        let dataset = prepare_dataset(frame(&[
            "63,1,3,145,233,1,0,150,0,2.3,0,0,1,1",
            "41,0,1,130,204,0,0,172,0,1.4,2,0,2,1",
        ]))
        .unwrap();
        let err = fit(&dataset, &TrainOptions::default()).unwrap_err();
        assert!(matches!(err, TrainError::SingleClass { present: "disease" }));
    }
}
