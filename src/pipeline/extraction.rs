//! Extraction orchestrator: pulls structured fields from classified
//! documents and counts each document against the checklist exactly once.
//!
//! The `extraction_completed` flag is flipped with a compare-and-set inside
//! the same transaction as the checklist increment and intake recompute.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::batch::{BatchReport, ItemOutcome};
use super::checklist::{self, IncrementOutcome};
use super::classification::load_document;
use super::collaborator::{call_with_deadline, FieldExtractor};
use super::storage::{load_document_bytes, BlobStore};
use super::PipelineError;
use crate::db::{repository, Database};
use crate::models::{count_present_fields, DocKind, Document, ExtractedFields};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub document_id: Uuid,
    pub doc_kind: DocKind,
    pub extracted_data: ExtractedFields,
    pub fields_extracted: usize,
    pub already_extracted: bool,
    /// Checklist state after this call's increment; absent on replay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<IncrementOutcome>,
}

impl ExtractionResult {
    fn replay(doc: Document) -> Self {
        let extracted_data = doc.extracted_data.unwrap_or_default();
        Self {
            document_id: doc.id,
            doc_kind: doc.doc_kind,
            fields_extracted: count_present_fields(&extracted_data),
            extracted_data,
            already_extracted: true,
            checklist: None,
        }
    }
}

/// Extract fields from one classified document.
///
/// A second call on an extracted document returns the stored fields
/// without calling the extractor or touching the checklist.
pub fn extract_one(
    db: &Database,
    blobs: &dyn BlobStore,
    extractor: &Arc<dyn FieldExtractor>,
    timeout: Duration,
    document_id: &Uuid,
) -> Result<ExtractionResult, PipelineError> {
    let doc = load_document(db, document_id)?;
    if !doc.is_classified() {
        return Err(PipelineError::InconsistentState(format!(
            "document {} is not classified; nothing to extract against",
            doc.id
        )));
    }
    if doc.extraction_completed {
        return Ok(ExtractionResult::replay(doc));
    }

    let bytes = load_document_bytes(blobs, &doc)?;
    let (kind, media_type) = (doc.doc_kind, doc.media_type);

    let fields = {
        let _span = tracing::info_span!(
            "extract_fields",
            document_id = %doc.id,
            kind = kind.as_str(),
        )
        .entered();
        let started = std::time::Instant::now();
        let extractor = Arc::clone(extractor);
        let fields = call_with_deadline(timeout, move |deadline| {
            extractor.extract(&bytes, media_type, kind, deadline)
        })
        .map_err(|source| {
            tracing::warn!(document_id = %doc.id, error = %source, "Extraction failed");
            PipelineError::ExtractionFailure {
                document_id: doc.id,
                source,
            }
        })?;
        tracing::info!(
            document_id = %doc.id,
            fields = fields.len(),
            elapsed_ms = %started.elapsed().as_millis(),
            "Fields extracted"
        );
        fields
    };

    let outcome = db.with_transaction(|tx| {
        if !repository::complete_extraction(tx, &doc.id, &fields)? {
            return Ok(None);
        }
        Ok::<_, PipelineError>(Some(checklist::increment(tx, &doc.intake_id, kind)?))
    })?;

    match outcome {
        Some(outcome) => Ok(ExtractionResult {
            document_id: doc.id,
            doc_kind: kind,
            fields_extracted: count_present_fields(&fields),
            extracted_data: fields,
            already_extracted: false,
            checklist: Some(outcome),
        }),
        None => {
            tracing::info!(document_id = %doc.id, "Extraction already recorded by a concurrent call");
            Ok(ExtractionResult::replay(load_document(db, document_id)?))
        }
    }
}

/// Extract every classified, not-yet-extracted document of an intake,
/// one at a time in upload order, isolating per-document failures.
pub fn extract_all(
    db: &Database,
    blobs: &dyn BlobStore,
    extractor: &Arc<dyn FieldExtractor>,
    timeout: Duration,
    intake_id: &Uuid,
) -> Result<BatchReport, PipelineError> {
    let ids = db.with_conn(|conn| {
        if !repository::intake_exists(conn, intake_id)? {
            return Err(PipelineError::not_found("Intake", *intake_id));
        }
        Ok(repository::list_extractable_document_ids(conn, intake_id)?)
    })?;

    let mut report = BatchReport::new(*intake_id);
    for id in ids {
        let outcome = match extract_one(db, blobs, extractor, timeout, &id) {
            Ok(r) if r.already_extracted => ItemOutcome::AlreadyExtracted { doc_kind: r.doc_kind },
            Ok(r) => ItemOutcome::Extracted {
                doc_kind: r.doc_kind,
                fields_extracted: r.fields_extracted,
            },
            Err(e) => ItemOutcome::failed(&e),
        };
        report.push(id, outcome);
    }

    tracing::info!(
        intake_id = %intake_id,
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "Intake extraction finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::models::{ChecklistKind, Complexity, IntakeStatus};
    use crate::pipeline::checklist::checklist_view;
    use crate::pipeline::collaborator::{CollaboratorError, ScriptedExtractor};
    use crate::pipeline::storage::MemoryBlobStore;
    use crate::pipeline::testing::{seed_intake, upload_png};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn scripted(e: ScriptedExtractor) -> (Arc<ScriptedExtractor>, Arc<dyn FieldExtractor>) {
        let e = Arc::new(e);
        let dynamic: Arc<dyn FieldExtractor> = e.clone();
        (e, dynamic)
    }

    fn classified(db: &Database, blobs: &MemoryBlobStore, intake_id: &Uuid, bytes: &[u8], kind: DocKind) -> Uuid {
        let doc = upload_png(db, blobs, intake_id, bytes);
        db.with_conn(|conn| repository::set_kind_if_unknown(conn, &doc.id, kind))
            .unwrap();
        doc.id
    }

    fn received(db: &Database, intake_id: &Uuid, kind: ChecklistKind) -> u32 {
        checklist_view(db, intake_id)
            .unwrap()
            .items
            .into_iter()
            .find(|i| i.item.doc_kind == kind)
            .map(|i| i.item.quantity_received)
            .unwrap_or(0)
    }

    #[test]
    fn extraction_stores_fields_and_counts_once() {
        let db = Database::open_in_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let intake_id = seed_intake(&db, Complexity::Simple);
        let doc_id = classified(&db, &blobs, &intake_id, b"T4 slip", DocKind::T4);
        let (counter, extractor) = scripted(ScriptedExtractor::canned());

        let first = extract_one(&db, &blobs, &extractor, TIMEOUT, &doc_id).unwrap();
        assert!(!first.already_extracted);
        assert_eq!(first.fields_extracted, 3);
        assert_eq!(first.checklist.as_ref().unwrap().item.as_ref().unwrap().quantity_received, 1);

        let second = extract_one(&db, &blobs, &extractor, TIMEOUT, &doc_id).unwrap();
        assert!(second.already_extracted);
        assert_eq!(second.extracted_data, first.extracted_data);
        assert!(second.checklist.is_none());

        assert_eq!(counter.calls(), 1);
        assert_eq!(received(&db, &intake_id, ChecklistKind::T4), 1);
    }

    #[test]
    fn unknown_document_is_inconsistent() {
        let db = Database::open_in_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let intake_id = seed_intake(&db, Complexity::Simple);
        let doc = upload_png(&db, &blobs, &intake_id, b"blank");
        let (counter, extractor) = scripted(ScriptedExtractor::canned());

        assert!(matches!(
            extract_one(&db, &blobs, &extractor, TIMEOUT, &doc.id),
            Err(PipelineError::InconsistentState(_))
        ));
        assert_eq!(counter.calls(), 0);
    }

    #[test]
    fn failure_leaves_flag_unset_and_is_retryable() {
        let db = Database::open_in_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let intake_id = seed_intake(&db, Complexity::Simple);
        let doc_id = classified(&db, &blobs, &intake_id, b"ID card", DocKind::Id);

        let (_, failing) = scripted(ScriptedExtractor::failing(CollaboratorError::MalformedResponse(
            "no JSON object".into(),
        )));
        let err = extract_one(&db, &blobs, &failing, TIMEOUT, &doc_id).unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionFailure { .. }));
        assert!(err.is_retryable());

        let doc = load_document(&db, &doc_id).unwrap();
        assert!(!doc.extraction_completed);
        assert!(doc.extracted_data.is_none());
        assert_eq!(received(&db, &intake_id, ChecklistKind::Id), 0);

        let (_, working) = scripted(ScriptedExtractor::canned());
        let retry = extract_one(&db, &blobs, &working, TIMEOUT, &doc_id).unwrap();
        assert!(!retry.already_extracted);
        assert_eq!(received(&db, &intake_id, ChecklistKind::Id), 1);
    }

    #[test]
    fn timeout_commits_nothing() {
        let db = Database::open_in_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let intake_id = seed_intake(&db, Complexity::Simple);
        let doc_id = classified(&db, &blobs, &intake_id, b"T4 slip", DocKind::T4);
        let (_, slow) =
            scripted(ScriptedExtractor::canned().with_delay(Duration::from_millis(300)));

        let err = extract_one(&db, &blobs, &slow, Duration::from_millis(20), &doc_id).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExtractionFailure {
                source: CollaboratorError::Timeout(_),
                ..
            }
        ));
        // Let the detached worker finish; it must not have written anything.
        std::thread::sleep(Duration::from_millis(400));
        assert!(!load_document(&db, &doc_id).unwrap().extraction_completed);
        assert_eq!(received(&db, &intake_id, ChecklistKind::T4), 0);
    }

    #[test]
    fn partial_fields_are_stored_as_is() {
        let db = Database::open_in_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let intake_id = seed_intake(&db, Complexity::Average);
        let doc_id = classified(&db, &blobs, &intake_id, b"RECEIPT", DocKind::Receipt);
        let (_, extractor) = scripted(ScriptedExtractor::new(|_| {
            Ok(json!({"merchant_name": "Depanneur", "total_amount": null})
                .as_object()
                .cloned()
                .unwrap_or_default())
        }));

        let result = extract_one(&db, &blobs, &extractor, TIMEOUT, &doc_id).unwrap();
        assert_eq!(result.fields_extracted, 1);
        let stored = load_document(&db, &doc_id).unwrap().extracted_data.unwrap();
        assert!(stored["total_amount"].is_null());
        assert_eq!(received(&db, &intake_id, ChecklistKind::Receipt), 1);
    }

    #[test]
    fn concurrent_extraction_counts_once() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let blobs = Arc::new(MemoryBlobStore::new());
        let intake_id = seed_intake(&db, Complexity::Average);
        let doc_id = classified(&db, &blobs, &intake_id, b"RECEIPT", DocKind::Receipt);
        let (_, extractor) =
            scripted(ScriptedExtractor::canned().with_delay(Duration::from_millis(20)));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let db = Arc::clone(&db);
                let blobs = Arc::clone(&blobs);
                let extractor = Arc::clone(&extractor);
                std::thread::spawn(move || {
                    extract_one(&db, blobs.as_ref(), &extractor, TIMEOUT, &doc_id).unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| !r.already_extracted).count(), 1);
        assert_eq!(received(&db, &intake_id, ChecklistKind::Receipt), 1);
    }

    #[test]
    fn concurrent_kinds_on_one_intake_flip_it_done() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let blobs = Arc::new(MemoryBlobStore::new());
        let intake_id = seed_intake(&db, Complexity::Simple);
        let t4 = classified(&db, &blobs, &intake_id, b"T4 slip", DocKind::T4);
        let id = classified(&db, &blobs, &intake_id, b"ID card", DocKind::Id);
        let (_, extractor) =
            scripted(ScriptedExtractor::canned().with_delay(Duration::from_millis(10)));

        let handles: Vec<_> = [t4, id]
            .into_iter()
            .map(|doc_id| {
                let db = Arc::clone(&db);
                let blobs = Arc::clone(&blobs);
                let extractor = Arc::clone(&extractor);
                std::thread::spawn(move || {
                    extract_one(&db, blobs.as_ref(), &extractor, TIMEOUT, &doc_id).unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let view = checklist_view(&db, &intake_id).unwrap();
        assert_eq!(view.intake_status, IntakeStatus::Done);
        assert!(view.items.iter().all(|i| i.is_complete));
    }

    #[test]
    fn batch_skips_unknown_and_isolates_failures() {
        let db = Database::open_in_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let intake_id = seed_intake(&db, Complexity::Average);
        let t4 = classified(&db, &blobs, &intake_id, b"T4 slip", DocKind::T4);
        let receipt = classified(&db, &blobs, &intake_id, b"RECEIPT", DocKind::Receipt);
        let unknown = upload_png(&db, &blobs, &intake_id, b"blank");

        let (_, extractor) = scripted(ScriptedExtractor::new(|kind| match kind {
            DocKind::Receipt => Err(CollaboratorError::Connection("http://localhost:11434".into())),
            other => ScriptedExtractor::canned().extract(
                b"",
                crate::models::MediaType::Png,
                other,
                std::time::Instant::now() + TIMEOUT,
            ),
        }));

        let report = extract_all(&db, &blobs, &extractor, TIMEOUT, &intake_id).unwrap();
        assert_eq!((report.total, report.succeeded, report.failed), (2, 1, 1));
        assert!(report.outcome_for(&unknown.id).is_none());
        assert!(matches!(
            report.outcome_for(&t4),
            Some(ItemOutcome::Extracted { doc_kind: DocKind::T4, fields_extracted: 3 })
        ));
        assert!(matches!(
            report.outcome_for(&receipt),
            Some(ItemOutcome::Failed { retryable: true, .. })
        ));

        let again = extract_all(&db, &blobs, &extractor, TIMEOUT, &intake_id).unwrap();
        assert_eq!(again.total, 1);
        assert_eq!(received(&db, &intake_id, ChecklistKind::T4), 1);
    }
}
