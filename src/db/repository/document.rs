use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{DocKind, Document, ExtractedFields, MediaType, NewDocument};

struct DocumentRow {
    id: String,
    intake_id: String,
    filename: String,
    sha256: String,
    media_type: String,
    size_bytes: i64,
    storage_locator: String,
    uploaded_at: DateTime<Utc>,
    doc_kind: String,
    extracted_data: Option<String>,
    extraction_completed: i32,
}

const DOCUMENT_COLUMNS: &str = "id, intake_id, filename, sha256, media_type, size_bytes,
     storage_locator, uploaded_at, doc_kind, extracted_data, extraction_completed";

pub fn insert_document(conn: &Connection, doc: &NewDocument) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, intake_id, filename, sha256, media_type, size_bytes,
         storage_locator, uploaded_at, doc_kind, extracted_data, extraction_completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, 0)",
        params![
            doc.id.to_string(),
            doc.intake_id.to_string(),
            doc.filename,
            doc.sha256,
            doc.media_type.as_str(),
            doc.size_bytes as i64,
            doc.storage_locator,
            doc.uploaded_at,
            DocKind::Unknown.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], read_row)
        .optional()?
        .map(document_from_row)
        .transpose()
}

/// Dedup lookup: same content within the same intake.
pub fn find_document_by_hash(
    conn: &Connection,
    intake_id: &Uuid,
    sha256: &str,
) -> Result<Option<Document>, DatabaseError> {
    let sql =
        format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE intake_id = ?1 AND sha256 = ?2");
    conn.query_row(&sql, params![intake_id.to_string(), sha256], read_row)
        .optional()?
        .map(document_from_row)
        .transpose()
}

/// All documents of an intake in upload order.
pub fn list_documents(conn: &Connection, intake_id: &Uuid) -> Result<Vec<Document>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE intake_id = ?1 ORDER BY uploaded_at, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![intake_id.to_string()], read_row)?;

    let mut docs = Vec::new();
    for row in rows {
        docs.push(document_from_row(row?)?);
    }
    Ok(docs)
}

/// Ids of documents still awaiting classification, in upload order.
pub fn list_unclassified_document_ids(
    conn: &Connection,
    intake_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    select_ids(
        conn,
        "SELECT id FROM documents WHERE intake_id = ?1 AND doc_kind = 'unknown'
         ORDER BY uploaded_at, rowid",
        intake_id,
    )
}

/// Ids of classified documents whose extraction has not completed, in upload order.
pub fn list_extractable_document_ids(
    conn: &Connection,
    intake_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    select_ids(
        conn,
        "SELECT id FROM documents
         WHERE intake_id = ?1 AND doc_kind <> 'unknown' AND extraction_completed = 0
         ORDER BY uploaded_at, rowid",
        intake_id,
    )
}

fn select_ids(conn: &Connection, sql: &str, intake_id: &Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![intake_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(parse_uuid("document id", &row?)?);
    }
    Ok(ids)
}

/// Compare-and-set the kind of a still-unknown document.
///
/// Returns `false` when the document was already classified (or is absent).
pub fn set_kind_if_unknown(
    conn: &Connection,
    id: &Uuid,
    kind: DocKind,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET doc_kind = ?2 WHERE id = ?1 AND doc_kind = 'unknown'",
        params![id.to_string(), kind.as_str()],
    )?;
    Ok(rows > 0)
}

/// Compare-and-set the extraction flag false -> true, storing the fields.
///
/// Returns `false` when the flag was already set; the stored fields are
/// left untouched in that case.
pub fn complete_extraction(
    conn: &Connection,
    id: &Uuid,
    fields: &ExtractedFields,
) -> Result<bool, DatabaseError> {
    let json = serde_json::to_string(fields)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("extracted_data: {e}")))?;
    let rows = conn.execute(
        "UPDATE documents SET extracted_data = ?2, extraction_completed = 1
         WHERE id = ?1 AND extraction_completed = 0 AND doc_kind <> 'unknown'",
        params![id.to_string(), json],
    )?;
    Ok(rows > 0)
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        intake_id: row.get(1)?,
        filename: row.get(2)?,
        sha256: row.get(3)?,
        media_type: row.get(4)?,
        size_bytes: row.get(5)?,
        storage_locator: row.get(6)?,
        uploaded_at: row.get(7)?,
        doc_kind: row.get(8)?,
        extracted_data: row.get(9)?,
        extraction_completed: row.get(10)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    let extracted_data = row
        .extracted_data
        .as_deref()
        .map(serde_json::from_str::<ExtractedFields>)
        .transpose()
        .map_err(|e| DatabaseError::ConstraintViolation(format!("extracted_data: {e}")))?;

    Ok(Document {
        id: parse_uuid("document id", &row.id)?,
        intake_id: parse_uuid("intake id", &row.intake_id)?,
        filename: row.filename,
        sha256: row.sha256,
        media_type: MediaType::from_str(&row.media_type)?,
        size_bytes: row.size_bytes.max(0) as u64,
        storage_locator: row.storage_locator,
        uploaded_at: row.uploaded_at,
        doc_kind: DocKind::from_str(&row.doc_kind)?,
        extracted_data,
        extraction_completed: row.extraction_completed != 0,
    })
}
