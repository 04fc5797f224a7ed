//! Server-rendered HTML for the prediction form.

use std::fmt::Write as _;

use crate::predict::{Prediction, RequestRecord};
use crate::schema::FEATURES;

/// What the page shows below the form.
#[derive(Debug, Clone, Copy)]
pub enum PageResult<'a> {
    Empty,
    Prediction(&'a Prediction),
    Error(&'a str),
}

/// Render the full page, refilling the form from `input` when present.
pub fn render(input: Option<&RequestRecord>, result: PageResult<'_>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(HEAD);
    html.push_str("<form method=\"post\" action=\"/predict\">\n");
    for spec in &FEATURES {
        let value = input
            .and_then(|record| record.get(spec.name))
            .map(String::as_str)
            .unwrap_or("");
        let _ = writeln!(
            html,
            "<label for=\"{name}\">{label}</label>\n<input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{value}\">",
            name = spec.name,
            label = escape(spec.label),
            value = escape(value),
        );
    }
    html.push_str("<button type=\"submit\">Predict</button>\n</form>\n");
    match result {
        PageResult::Empty => {}
        PageResult::Prediction(prediction) => {
            let _ = writeln!(
                html,
                "<div class=\"result\" style=\"border-color: {color}\">\n<h2 style=\"color: {color}\">{label}</h2>\n<p>{message}</p>\n</div>",
                color = prediction.outcome.color(),
                label = prediction.outcome.label(),
                message = escape(&prediction.message()),
            );
        }
        PageResult::Error(message) => {
            let _ = writeln!(html, "<div class=\"error\">{}</div>", escape(message));
        }
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const HEAD: &str = "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<title>Heart Disease Risk Predictor</title>
<style>
body { font-family: sans-serif; background: #f4f6f8; }
main { max-width: 640px; margin: 2rem auto; background: #fff; padding: 1.5rem; border-radius: 8px; }
form { display: grid; grid-template-columns: 1fr 1fr; gap: 0.5rem 1rem; }
button { grid-column: span 2; padding: 0.6rem; }
.result { margin-top: 1.5rem; border: 2px solid; border-radius: 6px; padding: 1rem; }
.error { margin-top: 1.5rem; color: #dc3545; }
</style>
</head>
<body>
<main>
<h1>Heart Disease Risk Predictor</h1>
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::Outcome;

    #[test]
    fn empty_page_lists_every_field() {
        let html = render(None, PageResult::Empty);
        for spec in &FEATURES {
            assert!(html.contains(&format!("name=\"{}\"", spec.name)));
        }
        assert!(!html.contains("class=\"result\""));
    }

    #[test]
    fn input_is_echoed_escaped() {
        let mut record = RequestRecord::new();
        record.insert("age".into(), "<63>".into());
        let html = render(Some(&record), PageResult::Error("bad \"age\""));
        assert!(html.contains("value=\"&lt;63&gt;\""));
        assert!(html.contains("bad &quot;age&quot;"));
    }

    #[test]
    fn prediction_shows_label_and_color() {
        let prediction = Prediction {
            outcome: Outcome::PossibleHeartDisease,
            probability_positive: 0.9,
        };
        let html = render(None, PageResult::Prediction(&prediction));
        assert!(html.contains("POSSIBLE HEART DISEASE"));
        assert!(html.contains("#dc3545"));
        assert!(html.contains("90.00%"));
    }
}
