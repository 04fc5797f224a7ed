use std::path::Path;

use heartrisk::predict::RequestRecord;
use heartrisk::schema::FEATURES;

/// Canonical CSV header: the 13 features followed by the label.
pub const CANONICAL_HEADER: [&str; 14] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal", "target",
];

/// The worked example patient, with `sex` given as text.
pub const EXAMPLE_ROW: [&str; 14] = [
    "63", "Male", "3", "145", "233", "1", "0", "150", "0", "2.3", "0", "0", "1", "1",
];

/// Deterministic synthetic patients in canonical column order.
///
/// The label depends on age, chest pain and exercise angina so both classes
/// are present and learnable.
pub fn patient_rows(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| {
            let age = 35 + (i * 7) % 40;
            let cp = i % 4;
            let exang = (i / 2) % 2;
            let target = usize::from(age > 55 || (cp == 0 && exang == 1));
            vec![
                age.to_string(),
                (i % 2).to_string(),
                cp.to_string(),
                (110 + (i * 13) % 60).to_string(),
                (180 + (i * 17) % 150).to_string(),
                ((i / 3) % 2).to_string(),
                (i % 3).to_string(),
                (100 + (i * 11) % 90).to_string(),
                exang.to_string(),
                format!("{:.1}", ((i * 3) % 40) as f64 / 10.0),
                (i % 3).to_string(),
                ((i / 4) % 4).to_string(),
                (1 + i % 3).to_string(),
                target.to_string(),
            ]
        })
        .collect()
}

/// Synthetic patients plus the worked example as the last row.
pub fn rows_with_example(n: usize) -> Vec<Vec<String>> {
    let mut rows = patient_rows(n);
    rows.push(EXAMPLE_ROW.iter().map(|s| s.to_string()).collect());
    rows
}

/// Header of the UCI `heart_disease_uci.csv` export.
pub const UCI_HEADER: [&str; 16] = [
    "id", "age", "sex", "dataset", "cp", "trestbps", "chol", "fbs", "restecg", "thalch", "exang",
    "oldpeak", "slope", "ca", "thal", "num",
];

/// Canonical rows rewritten in the UCI layout: text sex, `TRUE`/`FALSE`
/// flags, text thal codes, plus the extra `id` and `dataset` columns.
pub fn uci_rows(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let flag = |value: &str| if value == "1" { "TRUE" } else { "FALSE" }.to_string();
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let sex = if row[1] == "1" { "Male" } else { "Female" };
            let thal = match row[12].as_str() {
                "1" => "normal",
                "2" => "fixed defect",
                _ => "reversable defect",
            };
            vec![
                (i + 1).to_string(),
                row[0].clone(),
                sex.to_string(),
                "Cleveland".to_string(),
                row[2].clone(),
                row[3].clone(),
                row[4].clone(),
                flag(&row[5]),
                row[6].clone(),
                row[7].clone(),
                flag(&row[8]),
                row[9].clone(),
                row[10].clone(),
                row[11].clone(),
                thal.to_string(),
                row[13].clone(),
            ]
        })
        .collect()
}

/// Request record built from a UCI-layout row, keyed by canonical names.
pub fn request_from_uci_row(row: &[String]) -> RequestRecord {
    let canonical: Vec<String> = [1, 2, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]
        .iter()
        .map(|&idx| row[idx].clone())
        .collect();
    request_from_row(&canonical)
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) {
    let mut text = header.join(",");
    text.push('\n');
    for row in rows {
        text.push_str(&row.join(","));
        text.push('\n');
    }
    std::fs::write(path, text).expect("write csv fixture");
}

/// Request record holding the 13 feature values of a canonical row.
pub fn request_from_row(row: &[String]) -> RequestRecord {
    FEATURES
        .iter()
        .zip(row)
        .map(|(spec, value)| (spec.name.to_string(), value.clone()))
        .collect()
}

/// URL-encoded form body for a request record.
pub fn form_body(record: &RequestRecord) -> String {
    record
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
