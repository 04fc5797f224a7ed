//! Canonical clinical feature schema and the training-time alias table.
//!
//! The schema is the single place that says which raw fields exist, in which
//! order, and how each one is typed. Every boundary (CSV ingest, form
//! requests) is checked against it once instead of coercing ad hoc.

/// Semantic type of a canonical input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Continuous or count-like measurement, passed through as a number.
    Numeric,
    /// 0/1 field that also accepts the text labels handled by [`binary_code`].
    Binary,
    /// Small discrete code that is one-hot encoded before reaching the model.
    CategoricalCode,
}

/// Description of one canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical column name.
    pub name: &'static str,
    /// Semantic type.
    pub kind: FieldKind,
    /// Alternative source column names accepted at training time, in priority order.
    pub aliases: &'static [&'static str],
    /// Human-readable label used by the input form.
    pub label: &'static str,
}

impl FieldSpec {
    /// Whether the field is expanded into indicator columns.
    pub fn is_categorical(&self) -> bool {
        self.kind == FieldKind::CategoricalCode
    }
}

/// The 13 canonical input fields, in model order.
pub const FEATURES: [FieldSpec; 13] = [
    FieldSpec {
        name: "age",
        kind: FieldKind::Numeric,
        aliases: &[],
        label: "Age (years)",
    },
    FieldSpec {
        name: "sex",
        kind: FieldKind::Binary,
        aliases: &[],
        label: "Sex (1 = male, 0 = female)",
    },
    FieldSpec {
        name: "cp",
        kind: FieldKind::CategoricalCode,
        aliases: &["chest_pain_type"],
        label: "Chest pain type",
    },
    FieldSpec {
        name: "trestbps",
        kind: FieldKind::Numeric,
        aliases: &["bp", "resting_bp", "blood_pressure"],
        label: "Resting blood pressure (mm Hg)",
    },
    FieldSpec {
        name: "chol",
        kind: FieldKind::Numeric,
        aliases: &["cholesterol", "serum_chol"],
        label: "Serum cholesterol (mg/dl)",
    },
    FieldSpec {
        name: "fbs",
        kind: FieldKind::Binary,
        aliases: &[],
        label: "Fasting blood sugar > 120 mg/dl (1 = true, 0 = false)",
    },
    FieldSpec {
        name: "restecg",
        kind: FieldKind::CategoricalCode,
        aliases: &[],
        label: "Resting ECG result",
    },
    FieldSpec {
        name: "thalach",
        kind: FieldKind::Numeric,
        aliases: &["thalachh", "max_hr", "max_heart_rate", "thalch"],
        label: "Maximum heart rate achieved",
    },
    FieldSpec {
        name: "exang",
        kind: FieldKind::Binary,
        aliases: &[],
        label: "Exercise induced angina (1 = yes, 0 = no)",
    },
    FieldSpec {
        name: "oldpeak",
        kind: FieldKind::Numeric,
        aliases: &[],
        label: "ST depression induced by exercise",
    },
    FieldSpec {
        name: "slope",
        kind: FieldKind::CategoricalCode,
        aliases: &[],
        label: "Slope of the peak exercise ST segment",
    },
    FieldSpec {
        name: "ca",
        kind: FieldKind::CategoricalCode,
        aliases: &[],
        label: "Major vessels colored by fluoroscopy",
    },
    FieldSpec {
        name: "thal",
        kind: FieldKind::CategoricalCode,
        aliases: &[],
        label: "Thalassemia",
    },
];

/// The label column.
pub const TARGET: FieldSpec = FieldSpec {
    name: "target",
    kind: FieldKind::Numeric,
    aliases: &["output", "num", "diagnosis"],
    label: "Diagnosis",
};

/// Look up a canonical feature by name.
pub fn feature(name: &str) -> Option<&'static FieldSpec> {
    FEATURES.iter().find(|spec| spec.name == name)
}

/// Names of the canonical features, in model order.
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURES.iter().map(|spec| spec.name)
}

/// Names of the categorical-code features, in model order.
pub fn categorical_names() -> Vec<&'static str> {
    FEATURES
        .iter()
        .filter(|spec| spec.is_categorical())
        .map(|spec| spec.name)
        .collect()
}

/// Map a textual label of a binary field to its numeric code.
///
/// Covers `sex` (male = 1, female = 0) and boolean flags such as `fbs` and
/// `exang` (true/yes = 1, false/no = 0). Matching is case-insensitive and
/// ignores surrounding whitespace.
pub fn binary_code(label: &str) -> Option<f64> {
    match label.trim().to_ascii_lowercase().as_str() {
        "male" | "m" | "true" | "t" | "yes" | "y" => Some(1.0),
        "female" | "f" | "false" | "no" | "n" => Some(0.0),
        _ => None,
    }
}

/// Names of the binary features, in model order.
pub fn binary_names() -> Vec<&'static str> {
    FEATURES
        .iter()
        .filter(|spec| spec.kind == FieldKind::Binary)
        .map(|spec| spec.name)
        .collect()
}
