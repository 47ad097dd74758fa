//! Classification orchestrator: drives `unknown` documents through the
//! classifier collaborator.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::batch::{BatchReport, ItemOutcome};
use super::collaborator::{call_with_deadline, DocumentClassifier};
use super::storage::{load_document_bytes, BlobStore};
use super::PipelineError;
use crate::db::{repository, Database};
use crate::models::{DocKind, Document};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub document_id: Uuid,
    pub doc_kind: DocKind,
    pub already_classified: bool,
}

/// Classify one document.
///
/// Already-typed documents return immediately without a collaborator call.
/// A failed or timed-out call leaves the kind untouched.
pub fn classify_one(
    db: &Database,
    blobs: &dyn BlobStore,
    classifier: &Arc<dyn DocumentClassifier>,
    timeout: Duration,
    document_id: &Uuid,
) -> Result<ClassificationResult, PipelineError> {
    let doc = load_document(db, document_id)?;
    if doc.is_classified() {
        return Ok(ClassificationResult {
            document_id: doc.id,
            doc_kind: doc.doc_kind,
            already_classified: true,
        });
    }

    let bytes = load_document_bytes(blobs, &doc)?;
    let media_type = doc.media_type;

    let kind = {
        let _span = tracing::info_span!(
            "classify_document",
            document_id = %doc.id,
            media_type = media_type.as_str(),
        )
        .entered();
        let started = std::time::Instant::now();
        let classifier = Arc::clone(classifier);
        let kind = call_with_deadline(timeout, move |deadline| {
            classifier.classify(&bytes, media_type, deadline)
        })
        .map_err(|source| {
            tracing::warn!(document_id = %doc.id, error = %source, "Classification failed");
            PipelineError::ClassificationFailure {
                document_id: doc.id,
                source,
            }
        })?;
        tracing::info!(
            document_id = %doc.id,
            kind = kind.as_str(),
            elapsed_ms = %started.elapsed().as_millis(),
            "Document classified"
        );
        kind
    };

    if !kind.is_classified() {
        return Ok(ClassificationResult {
            document_id: doc.id,
            doc_kind: DocKind::Unknown,
            already_classified: false,
        });
    }

    let applied = db.with_conn(|conn| repository::set_kind_if_unknown(conn, &doc.id, kind))?;
    if applied {
        return Ok(ClassificationResult {
            document_id: doc.id,
            doc_kind: kind,
            already_classified: false,
        });
    }

    // A concurrent call classified it first; report what is stored.
    let stored = load_document(db, document_id)?;
    Ok(ClassificationResult {
        document_id: stored.id,
        doc_kind: stored.doc_kind,
        already_classified: true,
    })
}

/// Classify every `unknown` document of an intake, one at a time, in
/// upload order. Per-document failures are reported, never raised.
pub fn classify_all(
    db: &Database,
    blobs: &dyn BlobStore,
    classifier: &Arc<dyn DocumentClassifier>,
    timeout: Duration,
    intake_id: &Uuid,
) -> Result<BatchReport, PipelineError> {
    let ids = db.with_conn(|conn| {
        if !repository::intake_exists(conn, intake_id)? {
            return Err(PipelineError::not_found("Intake", *intake_id));
        }
        Ok(repository::list_unclassified_document_ids(conn, intake_id)?)
    })?;

    let mut report = BatchReport::new(*intake_id);
    for id in ids {
        let outcome = match classify_one(db, blobs, classifier, timeout, &id) {
            Ok(r) if r.already_classified => ItemOutcome::AlreadyClassified { doc_kind: r.doc_kind },
            Ok(r) => ItemOutcome::Classified { doc_kind: r.doc_kind },
            Err(e) => ItemOutcome::failed(&e),
        };
        report.push(id, outcome);
    }

    tracing::info!(
        intake_id = %intake_id,
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "Intake classification finished"
    );
    Ok(report)
}

pub(crate) fn load_document(db: &Database, id: &Uuid) -> Result<Document, PipelineError> {
    db.with_conn(|conn| repository::get_document(conn, id).map_err(PipelineError::from))?
        .ok_or_else(|| PipelineError::not_found("Document", *id))
}
