//! Per-document reports for intake-wide classification and extraction.

use serde::Serialize;
use uuid::Uuid;

use super::PipelineError;
use crate::models::DocKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Classified { doc_kind: DocKind },
    AlreadyClassified { doc_kind: DocKind },
    Extracted { doc_kind: DocKind, fields_extracted: usize },
    AlreadyExtracted { doc_kind: DocKind },
    Failed { error: String, retryable: bool },
}

impl ItemOutcome {
    pub fn failed(err: &PipelineError) -> Self {
        Self::Failed {
            error: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub document_id: Uuid,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub intake_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<BatchItem>,
}

impl BatchReport {
    pub fn new(intake_id: Uuid) -> Self {
        Self {
            intake_id,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, document_id: Uuid, outcome: ItemOutcome) {
        self.total += 1;
        match outcome {
            ItemOutcome::Classified { .. } | ItemOutcome::Extracted { .. } => self.succeeded += 1,
            ItemOutcome::AlreadyClassified { .. } | ItemOutcome::AlreadyExtracted { .. } => {
                self.skipped += 1
            }
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(BatchItem {
            document_id,
            outcome,
        });
    }

    pub fn outcome_for(&self, document_id: &Uuid) -> Option<&ItemOutcome> {
        self.results
            .iter()
            .find(|r| r.document_id == *document_id)
            .map(|r| &r.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_by_outcome() {
        let mut report = BatchReport::new(Uuid::nil());
        report.push(Uuid::new_v4(), ItemOutcome::Classified { doc_kind: DocKind::T4 });
        report.push(Uuid::new_v4(), ItemOutcome::AlreadyClassified { doc_kind: DocKind::Id });
        report.push(
            Uuid::new_v4(),
            ItemOutcome::Failed {
                error: "boom".into(),
                retryable: true,
            },
        );
        assert_eq!(
            (report.total, report.succeeded, report.skipped, report.failed),
            (3, 1, 1, 1)
        );
    }

    #[test]
    fn serializes_flat_items() {
        let mut report = BatchReport::new(Uuid::nil());
        let id = Uuid::nil();
        report.push(
            id,
            ItemOutcome::Extracted {
                doc_kind: DocKind::Receipt,
                fields_extracted: 2,
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        let item = &json["results"][0];
        assert_eq!(item["outcome"], "extracted");
        assert_eq!(item["doc_kind"], "receipt");
        assert_eq!(item["fields_extracted"], 2);
        assert_eq!(item["document_id"], id.to_string());
    }
}
