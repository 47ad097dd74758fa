//! Vision-model collaborators backed by a local Ollama instance.
//!
//! Images go to the model base64-encoded. PDFs are refused with
//! `UnsupportedInput`; the workflow keeps them `unknown` until a reviewer
//! or a scripted collaborator classifies them.
//!
//! Model calls queue on the shared `InferenceGate` only until the caller's
//! deadline; a call whose caller has given up never reaches the model.

pub mod ollama;
pub mod parser;
pub mod prompt;

use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use self::ollama::VisionChat;
use super::collaborator::{CollaboratorError, DocumentClassifier, FieldExtractor};
use crate::inference::{GateError, InferenceGate, OperationKind};
use crate::models::{DocKind, ExtractedFields, MediaType};

pub use ollama::OllamaClient;

fn encode_image(bytes: &[u8], media_type: MediaType) -> Result<String, CollaboratorError> {
    if !media_type.is_image() {
        return Err(CollaboratorError::UnsupportedInput(format!(
            "vision model accepts images only, got {media_type}"
        )));
    }
    Ok(STANDARD.encode(bytes))
}

fn gate_error(e: GateError) -> CollaboratorError {
    match e {
        GateError::DeadlineElapsed(waited) => {
            tracing::debug!(waited_ms = %waited.as_millis(), "Gave up waiting for the model");
            CollaboratorError::Timeout(waited)
        }
        GateError::LockPoisoned => CollaboratorError::Unavailable(e.to_string()),
    }
}

pub struct VisionClassifier {
    chat: Arc<dyn VisionChat>,
    gate: Arc<InferenceGate>,
    model: String,
}

impl VisionClassifier {
    pub fn new(chat: Arc<dyn VisionChat>, gate: Arc<InferenceGate>, model: impl Into<String>) -> Self {
        Self {
            chat,
            gate,
            model: model.into(),
        }
    }
}

impl DocumentClassifier for VisionClassifier {
    fn classify(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        deadline: Instant,
    ) -> Result<DocKind, CollaboratorError> {
        let image = encode_image(bytes, media_type)?;

        let _guard = self
            .gate
            .acquire_until(OperationKind::Classification, &self.model, deadline)
            .map_err(gate_error)?;

        let span = tracing::info_span!("vision_classify", model = %self.model, size = bytes.len());
        let _enter = span.enter();

        let answer = self.chat.chat_with_images(
            &self.model,
            prompt::CLASSIFICATION_PROMPT,
            std::slice::from_ref(&image),
            Some(prompt::CLASSIFICATION_SYSTEM),
            false,
        )?;

        let kind = match parser::parse_kind(&answer) {
            Some(kind) => kind,
            None => {
                tracing::debug!(answer_len = answer.len(), "No category in model answer");
                DocKind::Unknown
            }
        };
        tracing::info!(doc_kind = %kind, "Vision classification done");
        Ok(kind)
    }
}

pub struct VisionExtractor {
    chat: Arc<dyn VisionChat>,
    gate: Arc<InferenceGate>,
    model: String,
}

impl VisionExtractor {
    pub fn new(chat: Arc<dyn VisionChat>, gate: Arc<InferenceGate>, model: impl Into<String>) -> Self {
        Self {
            chat,
            gate,
            model: model.into(),
        }
    }
}

impl FieldExtractor for VisionExtractor {
    fn extract(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        kind: DocKind,
        deadline: Instant,
    ) -> Result<ExtractedFields, CollaboratorError> {
        let prompt = prompt::extraction_prompt(kind).ok_or_else(|| {
            CollaboratorError::UnsupportedInput("cannot extract fields from an unknown document".into())
        })?;
        let image = encode_image(bytes, media_type)?;

        let _guard = self
            .gate
            .acquire_until(OperationKind::Extraction, &self.model, deadline)
            .map_err(gate_error)?;

        let span = tracing::info_span!("vision_extract", model = %self.model, doc_kind = %kind);
        let _enter = span.enter();

        let answer = self.chat.chat_with_images(
            &self.model,
            &prompt,
            std::slice::from_ref(&image),
            Some(prompt::EXTRACTION_SYSTEM),
            true,
        )?;

        let mut fields = parser::parse_fields(&answer).map_err(CollaboratorError::MalformedResponse)?;
        let expected = prompt::expected_fields(kind);
        fields.retain(|name, _| expected.contains(&name.as_str()));

        tracing::info!(fields = fields.len(), "Vision extraction done");
        Ok(fields)
    }
}
