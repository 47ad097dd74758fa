use chrono::Utc;
use uuid::Uuid;

use super::format::sanitize_filename;
use super::hash::content_hash;
use crate::db::{repository, Database};
use crate::models::{Document, MediaType, NewDocument};
use crate::pipeline::storage::{blob_key, BlobStore};
use crate::pipeline::PipelineError;

/// One uploaded file as received from a transport.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub declared_media_type: String,
    pub bytes: Vec<u8>,
}

/// Ingest one upload into an intake.
///
/// Same bytes twice in the same intake yield `DuplicateDocument` and no
/// second blob write. Blob keys are content-addressed, so two racing
/// uploads of identical bytes write the same blob and the UNIQUE index on
/// `(intake_id, sha256)` picks the winner.
pub fn ingest_document(
    db: &Database,
    blobs: &dyn BlobStore,
    max_upload_bytes: u64,
    intake_id: &Uuid,
    upload: Upload,
) -> Result<Document, PipelineError> {
    let media_type = MediaType::parse_declared(&upload.declared_media_type)
        .ok_or_else(|| PipelineError::UnsupportedMediaType(upload.declared_media_type.clone()))?;

    let size_bytes = upload.bytes.len() as u64;
    if size_bytes == 0 {
        return Err(PipelineError::Validation("uploaded file is empty".into()));
    }
    if size_bytes > max_upload_bytes {
        return Err(PipelineError::Validation(format!(
            "uploaded file is {size_bytes} bytes, limit is {max_upload_bytes}"
        )));
    }

    let filename = sanitize_filename(&upload.filename);
    let sha256 = content_hash(&upload.bytes);

    db.with_conn(|conn| {
        if !repository::intake_exists(conn, intake_id)? {
            return Err(PipelineError::not_found("Intake", *intake_id));
        }
        if let Some(existing) = repository::find_document_by_hash(conn, intake_id, &sha256)? {
            return Err(duplicate(intake_id, &sha256, Some(existing.id)));
        }
        Ok(())
    })
    .inspect_err(|e| {
        if matches!(e, PipelineError::DuplicateDocument { .. }) {
            tracing::info!(intake_id = %intake_id, sha256 = %sha256, "Duplicate upload rejected");
        }
    })?;

    let key = blob_key(intake_id, &sha256, media_type.extension());
    let storage_locator = blobs.put(&key, &upload.bytes)?;

    let new_doc = NewDocument {
        id: Uuid::new_v4(),
        intake_id: *intake_id,
        filename,
        sha256,
        media_type,
        size_bytes,
        storage_locator,
        uploaded_at: Utc::now(),
    };

    db.with_conn(|conn| match repository::insert_document(conn, &new_doc) {
        Ok(()) => Ok(()),
        Err(e) if e.is_unique_violation() => {
            let existing = repository::find_document_by_hash(conn, intake_id, &new_doc.sha256)?;
            tracing::info!(
                intake_id = %intake_id,
                sha256 = %new_doc.sha256,
                "Concurrent duplicate upload rejected"
            );
            Err(duplicate(intake_id, &new_doc.sha256, existing.map(|d| d.id)))
        }
        Err(e) => Err(e.into()),
    })?;

    tracing::info!(
        document_id = %new_doc.id,
        intake_id = %intake_id,
        media_type = media_type.as_str(),
        size_bytes,
        "Document ingested"
    );

    Ok(Document {
        id: new_doc.id,
        intake_id: new_doc.intake_id,
        filename: new_doc.filename,
        sha256: new_doc.sha256,
        media_type: new_doc.media_type,
        size_bytes: new_doc.size_bytes,
        storage_locator: new_doc.storage_locator,
        uploaded_at: new_doc.uploaded_at,
        doc_kind: crate::models::DocKind::Unknown,
        extracted_data: None,
        extraction_completed: false,
    })
}

fn duplicate(intake_id: &Uuid, sha256: &str, existing_id: Option<Uuid>) -> PipelineError {
    PipelineError::DuplicateDocument {
        intake_id: *intake_id,
        sha256: sha256.to_string(),
        existing_id,
    }
}
