//! Text formatting for records and prediction results.
//!
//! The TUI and the CLI both render through these helpers so the two front
//! ends always agree on what a value looks like.

use crate::domain::{Field, FieldKind, FieldValue, FormRecord, PredictionResult};

pub const NOT_AVAILABLE: &str = "Not Available";

/// Whole-dollar en-US currency, or "Not Available" for missing, non-finite
/// or non-positive amounts.
pub fn format_currency(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => format!("${}", group_thousands(v.round() as u64)),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole dollars with the sign kept, so the summary shows what is submitted.
fn signed_dollars(v: f64) -> String {
    let rounded = v.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(rounded.abs() as u64))
}

/// Approval probability as a whole percentage (0..=100).
pub fn probability_percent(p: Option<f64>) -> Option<u8> {
    let p = p.filter(|v| v.is_finite())?;
    Some((p * 100.0).round().clamp(0.0, 100.0) as u8)
}

pub fn approval_badge(approved: bool) -> &'static str {
    if approved { "Approved" } else { "Declined" }
}

/// Loan range, shown only for approved applications.
pub fn format_range(result: &PredictionResult) -> String {
    if !result.approved {
        return NOT_AVAILABLE.to_string();
    }
    format!(
        "{} to {}",
        format_currency(result.range_low),
        format_currency(result.range_high)
    )
}

/// `[##########..........]` style bar for a percentage.
pub fn probability_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent) * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled.min(width)))
}

/// Display text for one field value on the summary page.
pub fn display_value(field: Field, value: &FieldValue) -> String {
    match value {
        FieldValue::Number(None) => "Not provided".to_string(),
        FieldValue::Number(Some(v)) => match field {
            Field::DependentChildren => format!("{v}"),
            _ => signed_dollars(*v),
        },
        FieldValue::Flag(true) => "Yes".to_string(),
        FieldValue::Flag(false) => "No".to_string(),
        FieldValue::Code(code) if code.is_empty() => "Not selected".to_string(),
        FieldValue::Code(code) => field
            .codes()
            .iter()
            .find(|o| o.code == code.as_str())
            .map(|o| format!("{} ({})", o.label, o.code))
            .unwrap_or_else(|| code.clone()),
    }
}

/// Every field of the record as `label: value` lines.
pub fn format_record_summary(record: &FormRecord) -> String {
    let width = Field::ALL.iter().map(|f| f.label().len()).max().unwrap_or(0);
    let mut out = String::new();
    for field in Field::ALL {
        out.push_str(&format!(
            "{:<width$}  {}\n",
            field.label(),
            display_value(field, &record.get(field))
        ));
    }
    out
}

/// Plain-text rendering of a prediction for terminal output.
pub fn format_result_summary(result: &PredictionResult) -> String {
    let mut out = String::new();

    out.push_str("=== Mortgage Assessment ===\n");
    out.push_str(&format!("Decision: {}\n", approval_badge(result.approved)));
    out.push_str(&format!("Predicted loan amount: {}\n", format_currency(result.prediction)));
    out.push_str(&format!("Loan range: {}\n", format_range(result)));
    match probability_percent(result.approval_probability) {
        Some(pct) => out.push_str(&format!(
            "Approval probability: {} {pct}%\n",
            probability_bar(pct, 20)
        )),
        None => out.push_str(&format!("Approval probability: {NOT_AVAILABLE}\n")),
    }

    if let Some(explanation) = result.explanation.as_ref().filter(|e| !e.is_empty()) {
        out.push_str("\nTop factors:\n");
        for item in explanation {
            out.push_str(&format!("  {:<32} {:>+10.4}\n", truncate(&item.feature, 32), item.shap_value));
        }
    }

    out
}

/// Column header → request key → kind table.
pub fn format_field_table() -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<48} {:<30} {:<8}\n", "column", "key", "kind"));
    out.push_str(&format!("{:-<48} {:-<30} {:-<8}\n", "", "", ""));
    for field in Field::ALL {
        let kind = match field.kind() {
            FieldKind::Numeric => "number",
            FieldKind::Boolean => "0/1",
            FieldKind::Code => "code",
        };
        out.push_str(&format!("{:<48} {:<30} {:<8}\n", truncate(field.column(), 48), field.key(), kind));
    }
    out
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
