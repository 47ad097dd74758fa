//! The intake workflow: templates, registry, ingestion, classification,
//! extraction and checklist accounting.

pub mod batch;
pub mod checklist;
pub mod classification;
pub mod clients;
pub mod collaborator;
pub mod extraction;
pub mod import;
pub mod intakes;
pub mod processor;
pub mod storage;
pub mod template;
pub mod vision;

#[cfg(test)]
pub(crate) mod testing;

pub use processor::{IntakePipeline, PipelineSettings};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use collaborator::CollaboratorError;
use storage::BlobError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A client with email {0} is already registered")]
    DuplicateEmail(String),

    #[error("Client {client_id} already has an intake for fiscal year {fiscal_year}")]
    DuplicateIntake { client_id: Uuid, fiscal_year: i32 },

    #[error("Intake {intake_id} already holds a document with SHA-256 {sha256}")]
    DuplicateDocument {
        intake_id: Uuid,
        sha256: String,
        existing_id: Option<Uuid>,
    },

    #[error("Unsupported media type: {0} (expected PDF, PNG or JPEG)")]
    UnsupportedMediaType(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    #[error("Classification of document {document_id} failed: {source}")]
    ClassificationFailure {
        document_id: Uuid,
        #[source]
        source: CollaboratorError,
    },

    #[error("Extraction of document {document_id} failed: {source}")]
    ExtractionFailure {
        document_id: Uuid,
        #[source]
        source: CollaboratorError,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Collaborator failures leave no state behind and may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ClassificationFailure { .. } | Self::ExtractionFailure { .. }
        )
    }
}
