//! Prompts for the vision model.

use crate::models::DocKind;

pub const CLASSIFICATION_SYSTEM: &str =
    "You are a document intake assistant for a tax preparation office. You look at one scanned document and name its category.";

pub const CLASSIFICATION_PROMPT: &str = "Classify this document into ONE of these categories:
- T4: Canadian T4 slip (Statement of Remuneration Paid)
- id: government-issued identification (driver's licence, passport, health card)
- receipt: purchase receipt or invoice
- unknown: none of the above

Answer with the category name only (T4, id, receipt or unknown).";

pub const EXTRACTION_SYSTEM: &str =
    "You transcribe values from scanned tax documents. Copy values exactly as printed. Never compute, convert or guess.";

/// Fields the extractor is asked for, per kind. The first entries are the
/// ones the checklist review relies on.
pub fn expected_fields(kind: DocKind) -> &'static [&'static str] {
    match kind {
        DocKind::T4 => &[
            "employer_name",
            "box14_employment_income",
            "box22_income_tax_deducted",
            "employee_name",
            "year",
        ],
        DocKind::Id => &["full_name", "date_of_birth", "id_number", "expiry_date", "address"],
        DocKind::Receipt => &["merchant_name", "total_amount", "date"],
        DocKind::Unknown => &[],
    }
}

fn document_label(kind: DocKind) -> &'static str {
    match kind {
        DocKind::T4 => "T4 slip (Statement of Remuneration Paid)",
        DocKind::Id => "identity document",
        DocKind::Receipt => "receipt",
        DocKind::Unknown => "document",
    }
}

/// Extraction prompt for `kind`; `None` for `unknown`.
pub fn extraction_prompt(kind: DocKind) -> Option<String> {
    let fields = expected_fields(kind);
    if fields.is_empty() {
        return None;
    }

    let schema = fields
        .iter()
        .map(|f| format!("  \"{f}\": \"string or null\""))
        .collect::<Vec<_>>()
        .join(",\n");

    Some(format!(
        "Extract the following fields from this {label} image.

Rules:
- Copy each value exactly as it appears (keep decimals, currency symbols, date format).
- Use null for any field that is missing or unreadable.
- Return ONLY a JSON object with exactly these keys:
{{
{schema}
}}",
        label = document_label(kind),
    ))
}
