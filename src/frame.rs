//! Minimal column-oriented table used by the trainer and the predictor.
//!
//! Cells are parsed once on ingest into [`Cell`]; later stages never look at
//! raw strings again.

use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Markers treated as an absent value in source data.
const MISSING_MARKERS: [&str; 4] = ["?", "na", "nan", "null"];

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Data file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column {column} has {actual} rows but expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// A single parsed table value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Parse a raw field: missing markers become [`Cell::Missing`], finite
    /// numbers become [`Cell::Number`], anything else is trimmed text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || MISSING_MARKERS
                .iter()
                .any(|marker| trimmed.eq_ignore_ascii_case(marker))
        {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Number(value),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }

    /// Canonical category token used in indicator column names.
    ///
    /// Integral numbers print without a fractional part so `3`, `3.0` and
    /// ` 3 ` all yield `"3"`.
    pub fn category_token(&self) -> Option<String> {
        match self {
            Cell::Number(value) => Some(format_number(*value)),
            Cell::Text(text) => Some(text.clone()),
            Cell::Missing => None,
        }
    }

    /// Ordering used for category enumeration: numbers ascending, then text.
    pub fn category_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Number(_), _) => Ordering::Less,
            (_, Cell::Number(_)) => Ordering::Greater,
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Text(_), Cell::Missing) => Ordering::Less,
            (Cell::Missing, Cell::Text(_)) => Ordering::Greater,
            (Cell::Missing, Cell::Missing) => Ordering::Equal,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Ordered set of equally long columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Result<Self, FrameError> {
        let n_rows = columns.first().map(|col| col.cells.len()).unwrap_or(0);
        let mut frame = Self {
            columns: Vec::with_capacity(columns.len()),
            n_rows,
        };
        for column in columns {
            frame.push(column)?;
        }
        Ok(frame)
    }

    /// Build a frame from a CSV file with a header row.
    pub fn from_csv_path(path: &Path) -> Result<Self, FrameError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FrameError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                FrameError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, FrameError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let mut columns: Vec<Column> = headers
            .iter()
            .map(|name| Column::new(name, Vec::new()))
            .collect();
        for record in reader.records() {
            let record = record?;
            for (column, raw) in columns.iter_mut().zip(record.iter()) {
                column.cells.push(Cell::parse(raw));
            }
        }
        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|col| col.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Append a column; it must match the frame's row count and have a fresh name.
    pub fn push(&mut self, column: Column) -> Result<(), FrameError> {
        if self.has_column(&column.name) {
            return Err(FrameError::DuplicateColumn(column.name));
        }
        if self.columns.is_empty() {
            self.n_rows = column.cells.len();
        } else if column.cells.len() != self.n_rows {
            return Err(FrameError::RaggedColumn {
                column: column.name,
                expected: self.n_rows,
                actual: column.cells.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column
                .cells
                .retain(|_| flags.next().copied().unwrap_or(false));
        }
        self.n_rows = keep.iter().take(self.n_rows).filter(|&&flag| flag).count();
    }
}
