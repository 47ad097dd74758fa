use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocKind, MediaType};

/// Field name -> value as returned by the extractor, stored verbatim.
pub type ExtractedFields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub intake_id: Uuid,
    pub filename: String,
    /// Lowercase hex SHA-256 of the raw bytes.
    pub sha256: String,
    pub media_type: MediaType,
    pub size_bytes: u64,
    pub storage_locator: String,
    pub uploaded_at: DateTime<Utc>,
    pub doc_kind: DocKind,
    pub extracted_data: Option<ExtractedFields>,
    pub extraction_completed: bool,
}

/// Insert payload for a freshly ingested document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub intake_id: Uuid,
    pub filename: String,
    pub sha256: String,
    pub media_type: MediaType,
    pub size_bytes: u64,
    pub storage_locator: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn is_classified(&self) -> bool {
        self.doc_kind.is_classified()
    }

    pub fn is_extracted(&self) -> bool {
        self.extraction_completed
    }

    /// Number of non-null extracted values.
    pub fn fields_extracted(&self) -> usize {
        self.extracted_data
            .as_ref()
            .map(count_present_fields)
            .unwrap_or(0)
    }
}

/// Document as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub is_classified: bool,
    pub is_extracted: bool,
    pub extension: &'static str,
    pub fields_extracted: usize,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self {
            is_classified: document.is_classified(),
            is_extracted: document.is_extracted(),
            extension: document.media_type.extension(),
            fields_extracted: document.fields_extracted(),
            document,
        }
    }
}

pub fn count_present_fields(fields: &ExtractedFields) -> usize {
    fields.values().filter(|v| !v.is_null()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_fields_are_not_counted() {
        let fields = json!({
            "merchant_name": "Corner Store",
            "total_amount": null,
        });
        let map = fields.as_object().unwrap().clone();
        assert_eq!(count_present_fields(&map), 1);
    }

    #[test]
    fn view_flattens_document() {
        let doc = Document {
            id: Uuid::new_v4(),
            intake_id: Uuid::new_v4(),
            filename: "t4.jpg".into(),
            sha256: "a".repeat(64),
            media_type: MediaType::Jpeg,
            size_bytes: 12,
            storage_locator: "x/y.jpg".into(),
            uploaded_at: Utc::now(),
            doc_kind: DocKind::T4,
            extracted_data: None,
            extraction_completed: false,
        };
        let json = serde_json::to_value(DocumentView::from(doc)).unwrap();
        assert_eq!(json["doc_kind"], "T4");
        assert_eq!(json["media_type"], "image/jpeg");
        assert_eq!(json["is_classified"], true);
        assert_eq!(json["is_extracted"], false);
        assert_eq!(json["extension"], "jpg");
        assert_eq!(json["fields_extracted"], 0);
    }
}
