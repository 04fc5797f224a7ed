//! Column reconciliation for training data.
//!
//! Source datasets name the same measurements differently (`thalch` vs
//! `thalach`, `num` vs `target`). Reconciliation renames whatever the source
//! provides to the canonical schema, exact names first and then aliases in
//! table order, and refuses to continue when anything required is absent.

use thiserror::Error;
use tracing::info;

use crate::frame::{Frame, FrameError};
use crate::schema::{FEATURES, FieldSpec, TARGET};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Could not find the target column ('{target}' or alternatives {aliases:?})")]
    MissingTargetColumn {
        target: &'static str,
        aliases: &'static [&'static str],
    },
    #[error("Required feature columns are missing: {}", missing.join(", "))]
    MissingRequiredColumn { missing: Vec<&'static str> },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// One source column that was renamed to its canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub source: String,
    pub canonical: &'static str,
}

/// Reconciled frame plus the audit trail of renamed columns.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Exactly the 13 canonical features in schema order, then the label.
    pub frame: Frame,
    pub mappings: Vec<ColumnMapping>,
}

/// Find the source column that satisfies `spec`: the exact name, else the
/// first alias present in `columns`.
pub fn resolve_column<'a>(columns: &[&'a str], spec: &FieldSpec) -> Option<&'a str> {
    if let Some(exact) = columns.iter().copied().find(|name| *name == spec.name) {
        return Some(exact);
    }
    spec.aliases
        .iter()
        .find_map(|alias| columns.iter().copied().find(|name| name == alias))
}

/// Rename source columns to the canonical schema and drop everything else.
pub fn reconcile(mut frame: Frame) -> Result<Reconciled, ReconcileError> {
    let (target_source, feature_sources) = {
        let names = frame.column_names();
        let target_source = resolve_column(&names, &TARGET)
            .map(str::to_string)
            .ok_or(ReconcileError::MissingTargetColumn {
                target: TARGET.name,
                aliases: TARGET.aliases,
            })?;

        let mut missing = Vec::new();
        let mut feature_sources = Vec::with_capacity(FEATURES.len());
        for spec in &FEATURES {
            match resolve_column(&names, spec) {
                Some(source) => feature_sources.push((source.to_string(), spec.name)),
                None => missing.push(spec.name),
            }
        }
        if !missing.is_empty() {
            return Err(ReconcileError::MissingRequiredColumn { missing });
        }
        (target_source, feature_sources)
    };

    let mut mappings = Vec::new();
    let mut out = Frame::default();
    for (source, canonical) in feature_sources
        .into_iter()
        .chain([(target_source, TARGET.name)])
    {
        let Some(mut column) = frame.remove(&source) else {
            continue;
        };
        if source != canonical {
            info!("Mapped column '{source}' to '{canonical}'");
            mappings.push(ColumnMapping { source, canonical });
        }
        column.name = canonical.to_string();
        out.push(column)?;
    }

    Ok(Reconciled {
        frame: out,
        mappings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::feature_names;

    const CANONICAL_HEADER: &str =
        "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target";
    const ROW: &str = "63,1,3,145,233,1,0,150,0,2.3,0,0,1,1";

    fn frame_with_header(header: &str) -> Frame {
        Frame::from_csv_reader(format!("{header}\n{ROW}\n").as_bytes()).unwrap()
    }

    #[test]
    fn canonical_input_passes_through() {
        let reconciled = reconcile(frame_with_header(CANONICAL_HEADER)).unwrap();
        assert!(reconciled.mappings.is_empty());
        let expected: Vec<_> = feature_names().chain(["target"]).collect();
        assert_eq!(reconciled.frame.column_names(), expected);
    }

    #[test]
    fn every_single_alias_matches_canonical_table() {
        let canonical = reconcile(frame_with_header(CANONICAL_HEADER)).unwrap().frame;
        for spec in FEATURES.iter().chain([&TARGET]) {
            for alias in spec.aliases {
                let header = CANONICAL_HEADER
                    .split(',')
                    .map(|name| if name == spec.name { *alias } else { name })
                    .collect::<Vec<_>>()
                    .join(",");
                let reconciled = reconcile(frame_with_header(&header)).unwrap();
                assert_eq!(reconciled.frame, canonical, "alias {alias}");
                assert_eq!(
                    reconciled.mappings,
                    vec![ColumnMapping {
                        source: alias.to_string(),
                        canonical: spec.name,
                    }]
                );
            }
        }
    }

    #[test]
    fn exact_name_wins_over_alias() {
        let header = format!("{CANONICAL_HEADER},thalch");
        let frame = Frame::from_csv_reader(format!("{header}\n{ROW},999\n").as_bytes()).unwrap();
        let reconciled = reconcile(frame).unwrap();
        let thalach = reconciled.frame.column("thalach").unwrap();
        assert_eq!(thalach.cells[0].as_number(), Some(150.0));
        assert!(!reconciled.frame.has_column("thalch"));
    }

    #[test]
    fn first_matching_alias_wins() {
        let header = CANONICAL_HEADER.replace("thalach", "max_hr") + ",thalch";
        let frame = Frame::from_csv_reader(format!("{header}\n{ROW},999\n").as_bytes()).unwrap();
        let reconciled = reconcile(frame).unwrap();
        assert_eq!(reconciled.mappings[0].source, "max_hr");
        let thalach = reconciled.frame.column("thalach").unwrap();
        assert_eq!(thalach.cells[0].as_number(), Some(150.0));
    }

    #[test]
    fn missing_target_fails_first() {
        let header = CANONICAL_HEADER.replace(",target", ",label");
        let err = reconcile(frame_with_header(&header)).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingTargetColumn { .. }));
    }

    #[test]
    fn names_every_missing_feature() {
        let header = CANONICAL_HEADER
            .replace("chol", "lipids")
            .replace("slope", "st_slope");
        let err = reconcile(frame_with_header(&header)).unwrap_err();
        match err {
            ReconcileError::MissingRequiredColumn { missing } => {
                assert_eq!(missing, vec!["chol", "slope"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
