//! Seams to the model-backed collaborators.
//!
//! The workflow only sees these traits. `call_with_deadline` bounds every
//! call: an elapsed deadline is reported as `CollaboratorError::Timeout`
//! and the caller commits nothing. Collaborators receive the same deadline
//! and must not start model work once it has passed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{DocKind, ExtractedFields, MediaType};

#[derive(Error, Debug, Clone)]
pub enum CollaboratorError {
    #[error("Model service not reachable at {0}")]
    Connection(String),

    #[error("Model service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

pub trait DocumentClassifier: Send + Sync {
    /// One of T4, receipt, id or unknown for the given bytes.
    fn classify(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        deadline: Instant,
    ) -> Result<DocKind, CollaboratorError>;
}

pub trait FieldExtractor: Send + Sync {
    /// Field name -> value for a document already known to be `kind`.
    /// Partial maps are valid answers.
    fn extract(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        kind: DocKind,
        deadline: Instant,
    ) -> Result<ExtractedFields, CollaboratorError>;
}

/// Run `call` on a worker thread and wait at most `timeout` for it.
///
/// `call` receives the deadline so it can give up before spending model
/// time. On timeout the worker is detached; its eventual result is dropped.
pub fn call_with_deadline<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce(Instant) -> Result<T, CollaboratorError> + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    let (tx, rx) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("collaborator-call".into())
        .spawn(move || {
            let _ = tx.send(call(deadline));
        })
        .map_err(|e| CollaboratorError::Unavailable(format!("cannot spawn worker: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(CollaboratorError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(CollaboratorError::Unavailable(
            "collaborator worker exited without a result".into(),
        )),
    }
}

// ──────────────────────────────────────────────
// Scripted collaborators (tests, offline runs)
// ──────────────────────────────────────────────

type ClassifyRule = dyn Fn(&[u8]) -> Result<DocKind, CollaboratorError> + Send + Sync;
type ExtractRule = dyn Fn(DocKind) -> Result<ExtractedFields, CollaboratorError> + Send + Sync;

/// Classifier driven by a closure over the raw bytes. Counts invocations.
pub struct ScriptedClassifier {
    rule: Box<ClassifyRule>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(
        rule: impl Fn(&[u8]) -> Result<DocKind, CollaboratorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            rule: Box::new(rule),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(kind: DocKind) -> Self {
        Self::new(move |_| Ok(kind))
    }

    /// Picks the kind from a marker in the content: `T4`, `RECEIPT` or `ID`.
    pub fn by_marker() -> Self {
        Self::new(|bytes| Ok(kind_from_marker(bytes)))
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentClassifier for ScriptedClassifier {
    fn classify(
        &self,
        bytes: &[u8],
        _media_type: MediaType,
        _deadline: Instant,
    ) -> Result<DocKind, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        (self.rule)(bytes)
    }
}

/// Extractor driven by a closure over the kind. Counts invocations.
pub struct ScriptedExtractor {
    rule: Box<ExtractRule>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(
        rule: impl Fn(DocKind) -> Result<ExtractedFields, CollaboratorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            rule: Box::new(rule),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Plausible fields for every kind.
    pub fn canned() -> Self {
        Self::new(|kind| Ok(sample_fields(kind)))
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FieldExtractor for ScriptedExtractor {
    fn extract(
        &self,
        _bytes: &[u8],
        _media_type: MediaType,
        kind: DocKind,
        _deadline: Instant,
    ) -> Result<ExtractedFields, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        (self.rule)(kind)
    }
}

fn kind_from_marker(bytes: &[u8]) -> DocKind {
    let contains = |needle: &[u8]| bytes.windows(needle.len()).any(|w| w == needle);
    if contains(b"T4") {
        DocKind::T4
    } else if contains(b"RECEIPT") {
        DocKind::Receipt
    } else if contains(b"ID") {
        DocKind::Id
    } else {
        DocKind::Unknown
    }
}

fn sample_fields(kind: DocKind) -> ExtractedFields {
    let value = match kind {
        DocKind::T4 => json!({
            "employer_name": "Northwind Logistics",
            "box14_employment_income": 58250.00,
            "box22_income_tax_deducted": 9120.55,
        }),
        DocKind::Id => json!({
            "full_name": "Ada Tremblay",
            "date_of_birth": "1988-04-12",
            "id_number": "T1234-56789-01234",
        }),
        DocKind::Receipt => json!({
            "merchant_name": "Pharmacie Centrale",
            "total_amount": 42.17,
        }),
        DocKind::Unknown => Value::Object(Default::default()),
    };
    match value {
        Value::Object(map) => map,
        _ => ExtractedFields::new(),
    }
}
