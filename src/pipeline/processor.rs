//! Intake workflow facade.
//!
//! Single entry point over the workflow components. Collaborators are
//! injected as trait objects so transports and tests choose the
//! implementation. Every method is blocking; async callers wrap them in
//! `spawn_blocking`.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::batch::BatchReport;
use super::checklist::{self, ChecklistView};
use super::classification::{self, ClassificationResult};
use super::clients::{self, NewClient};
use super::collaborator::{DocumentClassifier, FieldExtractor};
use super::extraction::{self, ExtractionResult};
use super::import::{self, Upload};
use super::intakes::{self, NewIntake};
use super::storage::BlobStore;
use super::PipelineError;
use crate::config;
use crate::db::Database;
use crate::models::{Client, Document, Intake};

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub max_upload_bytes: u64,
    pub collaborator_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: config::DEFAULT_MAX_UPLOAD_BYTES,
            collaborator_timeout: Duration::from_secs(config::DEFAULT_COLLABORATOR_TIMEOUT_SECS),
        }
    }
}

pub struct IntakePipeline {
    db: Arc<Database>,
    blobs: Arc<dyn BlobStore>,
    classifier: Arc<dyn DocumentClassifier>,
    extractor: Arc<dyn FieldExtractor>,
    settings: PipelineSettings,
}

impl IntakePipeline {
    pub fn new(
        db: Arc<Database>,
        blobs: Arc<dyn BlobStore>,
        classifier: Arc<dyn DocumentClassifier>,
        extractor: Arc<dyn FieldExtractor>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            blobs,
            classifier,
            extractor,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    // ── Clients & intakes ───────────────────────────────────

    pub fn create_client(&self, input: NewClient) -> Result<Client, PipelineError> {
        clients::create_client(&self.db, input)
    }

    pub fn get_client(&self, id: &Uuid) -> Result<Client, PipelineError> {
        clients::get_client(&self.db, id)
    }

    pub fn create_intake(&self, input: NewIntake) -> Result<Intake, PipelineError> {
        intakes::create_intake(&self.db, input)
    }

    pub fn get_intake(&self, id: &Uuid) -> Result<Intake, PipelineError> {
        intakes::get_intake(&self.db, id)
    }

    pub fn list_documents(&self, intake_id: &Uuid) -> Result<Vec<Document>, PipelineError> {
        intakes::list_documents(&self.db, intake_id)
    }

    // ── Documents ───────────────────────────────────────────

    pub fn ingest(&self, intake_id: &Uuid, upload: Upload) -> Result<Document, PipelineError> {
        import::ingest_document(
            &self.db,
            self.blobs.as_ref(),
            self.settings.max_upload_bytes,
            intake_id,
            upload,
        )
    }

    pub fn get_document(&self, id: &Uuid) -> Result<Document, PipelineError> {
        classification::load_document(&self.db, id)
    }

    pub fn classify_one(&self, document_id: &Uuid) -> Result<ClassificationResult, PipelineError> {
        classification::classify_one(
            &self.db,
            self.blobs.as_ref(),
            &self.classifier,
            self.settings.collaborator_timeout,
            document_id,
        )
    }

    pub fn classify_all(&self, intake_id: &Uuid) -> Result<BatchReport, PipelineError> {
        classification::classify_all(
            &self.db,
            self.blobs.as_ref(),
            &self.classifier,
            self.settings.collaborator_timeout,
            intake_id,
        )
    }

    pub fn extract_one(&self, document_id: &Uuid) -> Result<ExtractionResult, PipelineError> {
        extraction::extract_one(
            &self.db,
            self.blobs.as_ref(),
            &self.extractor,
            self.settings.collaborator_timeout,
            document_id,
        )
    }

    pub fn extract_all(&self, intake_id: &Uuid) -> Result<BatchReport, PipelineError> {
        extraction::extract_all(
            &self.db,
            self.blobs.as_ref(),
            &self.extractor,
            self.settings.collaborator_timeout,
            intake_id,
        )
    }

    // ── Checklist ───────────────────────────────────────────

    pub fn checklist(&self, intake_id: &Uuid) -> Result<ChecklistView, PipelineError> {
        checklist::checklist_view(&self.db, intake_id)
    }
}
