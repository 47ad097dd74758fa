//! Process-wide state shared by the HTTP handlers.
//!
//! `CoreState` owns the configured workflow facade and the inference gate.
//! It is wrapped in `Arc` once at startup; handlers clone the `Arc`.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::{Database, DatabaseError};
use crate::inference::{ActiveOperation, InferenceGate};
use crate::pipeline::collaborator::{CollaboratorError, DocumentClassifier, FieldExtractor};
use crate::pipeline::storage::{BlobError, BlobStore, FsBlobStore};
use crate::pipeline::vision::{OllamaClient, VisionClassifier, VisionExtractor};
use crate::pipeline::{IntakePipeline, PipelineSettings};

pub struct CoreState {
    pub config: AppConfig,
    pipeline: Arc<IntakePipeline>,
    inference: Arc<InferenceGate>,
}

impl CoreState {
    /// Wire the production stack: SQLite file, filesystem bucket, and the
    /// Ollama vision collaborators behind one inference gate.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let db = Arc::new(Database::open(&config.db_path)?);
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.bucket_dir)?);

        let inference = Arc::new(InferenceGate::new());
        let chat = Arc::new(OllamaClient::new(
            &config.ollama_host,
            config.collaborator_timeout_secs,
        )?);
        check_vision_model(&chat, &config.vision_model);
        let classifier: Arc<dyn DocumentClassifier> = Arc::new(VisionClassifier::new(
            chat.clone(),
            inference.clone(),
            config.vision_model.clone(),
        ));
        let extractor: Arc<dyn FieldExtractor> = Arc::new(VisionExtractor::new(
            chat,
            inference.clone(),
            config.vision_model.clone(),
        ));

        tracing::info!(
            db = %config.db_path.display(),
            bucket = %config.bucket_dir.display(),
            ollama = %config.ollama_host,
            model = %config.vision_model,
            "Core state initialized"
        );

        Ok(Self::with_components(config, db, blobs, classifier, extractor, inference))
    }

    /// Assemble state from already-built components.
    pub fn with_components(
        config: AppConfig,
        db: Arc<Database>,
        blobs: Arc<dyn BlobStore>,
        classifier: Arc<dyn DocumentClassifier>,
        extractor: Arc<dyn FieldExtractor>,
        inference: Arc<InferenceGate>,
    ) -> Self {
        let settings = PipelineSettings {
            max_upload_bytes: config.max_upload_bytes,
            collaborator_timeout: Duration::from_secs(config.collaborator_timeout_secs),
        };
        let pipeline = Arc::new(IntakePipeline::new(db, blobs, classifier, extractor, settings));
        Self {
            config,
            pipeline,
            inference,
        }
    }

    pub fn pipeline(&self) -> Arc<IntakePipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn inference_busy(&self) -> bool {
        self.inference.is_busy()
    }

    pub fn current_inference(&self) -> Option<ActiveOperation> {
        self.inference.current_operation()
    }
}

/// Warn early when the configured model is missing. Never fatal: Ollama may
/// come up or pull the model after the service starts.
fn check_vision_model(client: &OllamaClient, model: &str) -> bool {
    match client.is_model_available(model) {
        Ok(true) => {
            tracing::info!(model, "Vision model available");
            true
        }
        Ok(false) => {
            tracing::warn!(model, "Vision model not pulled; model calls will fail until it is");
            false
        }
        Err(e) => {
            tracing::warn!(model, error = %e, "Cannot list Ollama models at startup");
            false
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),
    #[error("Model client error: {0}")]
    Collaborator(#[from] CollaboratorError),
}
