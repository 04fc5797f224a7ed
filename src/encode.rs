//! Categorical encoding shared by the trainer and the predictor, plus the
//! predictor-side alignment onto the saved feature list.

use std::collections::HashMap;

use thiserror::Error;

use crate::frame::{Cell, Column, Frame, FrameError};
use crate::schema::binary_code;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unrecognized value '{value}' in column '{column}' (row {row})")]
    UnrecognizedLabel {
        column: String,
        row: usize,
        value: String,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Whether the first category of each field is dropped as the reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Training: drop the reference level so the indicators are not collinear.
    DropFirst,
    /// Inference: keep every observed level; alignment filters later.
    KeepAll,
}

/// Result of coercing one raw value to a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Number(f64),
    Missing,
    Unparseable(String),
}

impl Coerced {
    pub fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Number(value) => Coerced::Number(*value),
            Cell::Missing => Coerced::Missing,
            Cell::Text(text) => Coerced::Unparseable(text.clone()),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Coerced::Number(value) => Some(*value),
            _ => None,
        }
    }
}

/// Coerce a raw field value to a number.
pub fn coerce(raw: &str) -> Coerced {
    Coerced::from_cell(&Cell::parse(raw))
}

/// Indicator column name for one category of a field.
pub fn indicator_name(field: &str, token: &str) -> String {
    format!("{field}_{token}")
}

/// Replace text labels of a binary field (`Male`/`Female`, `TRUE`/`FALSE`,
/// ...) with 1/0 in `column`.
///
/// Returns the number of cells rewritten. Text that is not a known label is
/// an error, numeric and missing cells are left untouched.
pub fn normalize_binary(frame: &mut Frame, column: &str) -> Result<usize, EncodeError> {
    let Some(col) = frame.column_mut(column) else {
        return Ok(0);
    };
    let mut rewritten = 0usize;
    for (row, cell) in col.cells.iter_mut().enumerate() {
        if let Cell::Text(text) = cell {
            let code = binary_code(text).ok_or_else(|| EncodeError::UnrecognizedLabel {
                column: column.to_string(),
                row,
                value: text.clone(),
            })?;
            *cell = Cell::Number(code);
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

/// Distinct non-missing categories of a column, in category order.
pub fn categories(column: &Column) -> Vec<Cell> {
    let mut seen: Vec<Cell> = Vec::new();
    for cell in &column.cells {
        if cell.is_missing() {
            continue;
        }
        let token = cell.category_token();
        if !seen.iter().any(|known| known.category_token() == token) {
            seen.push(cell.clone());
        }
    }
    seen.sort_by(Cell::category_cmp);
    seen
}

/// One-hot encode `fields` in `frame`.
///
/// Each listed column present in the frame is removed and replaced by
/// `<field>_<value>` indicator columns (1.0 / 0.0) appended after the
/// remaining columns, grouped by field in the order given. Missing cells
/// produce all-zero indicators.
pub fn one_hot(
    mut frame: Frame,
    fields: &[&str],
    policy: DropPolicy,
) -> Result<Frame, EncodeError> {
    for field in fields {
        let Some(column) = frame.remove(field) else {
            continue;
        };
        let levels = categories(&column);
        let skip = match policy {
            DropPolicy::DropFirst => 1,
            DropPolicy::KeepAll => 0,
        };
        let tokens: Vec<Option<String>> = column.cells.iter().map(Cell::category_token).collect();
        for level in levels.iter().skip(skip) {
            let level_token = level.category_token();
            let cells = tokens
                .iter()
                .map(|token| {
                    if token.is_some() && *token == level_token {
                        Cell::Number(1.0)
                    } else {
                        Cell::Number(0.0)
                    }
                })
                .collect();
            let name = indicator_name(field, level_token.as_deref().unwrap_or_default());
            frame.push(Column::new(name, cells))?;
        }
    }
    Ok(frame)
}

/// Project row `row` of an encoded frame onto the saved feature list.
///
/// Saved columns present in the frame contribute their numeric value, all
/// others are zero. Frame columns outside `features` are ignored.
pub fn align(frame: &Frame, row: usize, features: &[String]) -> Vec<f64> {
    let by_name: HashMap<&str, &Column> = frame
        .columns()
        .iter()
        .map(|col| (col.name.as_str(), col))
        .collect();
    features
        .iter()
        .map(|name| {
            by_name
                .get(name.as_str())
                .and_then(|col| col.cells.get(row))
                .and_then(Cell::as_number)
                .unwrap_or(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: Vec<(&str, Vec<&str>)>) -> Frame {
        Frame::new(
            columns
                .into_iter()
                .map(|(name, raw)| Column::new(name, raw.into_iter().map(Cell::parse).collect()))
                .collect(),
        )
        .unwrap()
    }

    fn numbers(frame: &Frame, name: &str) -> Vec<f64> {
        frame
            .column(name)
            .unwrap()
            .cells
            .iter()
            .map(|cell| cell.as_number().unwrap())
            .collect()
    }

    #[test]
    fn sex_labels_become_codes() {
        let mut data = frame(vec![("sex", vec!["Male", "F", "1", "?"])]);
        let rewritten = normalize_binary(&mut data, "sex").unwrap();
        assert_eq!(rewritten, 2);
        assert_eq!(
            data.column("sex").unwrap().cells,
            vec![
                Cell::Number(1.0),
                Cell::Number(0.0),
                Cell::Number(1.0),
                Cell::Missing
            ]
        );
    }

    #[test]
    fn boolean_flags_become_codes() {
        let mut data = frame(vec![("fbs", vec!["TRUE", "FALSE", "0"])]);
        assert_eq!(normalize_binary(&mut data, "fbs").unwrap(), 2);
        assert_eq!(numbers(&data, "fbs"), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_sex_label_is_rejected() {
        let mut data = frame(vec![("sex", vec!["Male", "unknown"])]);
        let err = normalize_binary(&mut data, "sex").unwrap_err();
        assert!(matches!(err, EncodeError::UnrecognizedLabel { row: 1, .. }));
    }

    #[test]
    fn drop_first_removes_reference_level() {
        let data = frame(vec![("age", vec!["50", "60", "70"]), ("cp", vec!["2", "0", "3"])]);
        let encoded = one_hot(data, &["cp"], DropPolicy::DropFirst).unwrap();
        assert_eq!(encoded.column_names(), vec!["age", "cp_2", "cp_3"]);
        assert_eq!(numbers(&encoded, "cp_2"), vec![1.0, 0.0, 0.0]);
        assert_eq!(numbers(&encoded, "cp_3"), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn keep_all_emits_every_observed_level() {
        let data = frame(vec![
            ("cp", vec!["3.0"]),
            ("thal", vec!["fixed defect"]),
            ("age", vec!["41"]),
        ]);
        let encoded = one_hot(data, &["cp", "thal"], DropPolicy::KeepAll).unwrap();
        assert_eq!(encoded.column_names(), vec!["age", "cp_3", "thal_fixed defect"]);
    }

    #[test]
    fn equivalent_numeric_spellings_share_a_level() {
        let data = frame(vec![("ca", vec!["1", "1.0", "2", "?"])]);
        let encoded = one_hot(data, &["ca"], DropPolicy::KeepAll).unwrap();
        assert_eq!(encoded.column_names(), vec!["ca_1", "ca_2"]);
        assert_eq!(numbers(&encoded, "ca_1"), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(numbers(&encoded, "ca_2"), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn align_zero_fills_and_discards() {
        let data = frame(vec![("age", vec!["63"]), ("cp", vec!["1"]), ("thal", vec!["7"])]);
        let encoded = one_hot(data, &["cp", "thal"], DropPolicy::KeepAll).unwrap();
        let features: Vec<String> = ["cp_2", "age", "cp_1", "thal_3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = align(&encoded, 0, &features);
        assert_eq!(row, vec![0.0, 63.0, 1.0, 0.0]);
        assert_eq!(row.len(), features.len());
    }

    #[test]
    fn coerce_distinguishes_outcomes() {
        assert_eq!(coerce("145"), Coerced::Number(145.0));
        assert_eq!(coerce(" "), Coerced::Missing);
        assert_eq!(coerce("high"), Coerced::Unparseable("high".into()));
        assert_eq!(coerce("high").value(), None);
    }
}
