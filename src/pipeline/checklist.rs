//! Checklist aggregator: quantity bookkeeping and the intake status rule.
//!
//! `increment` must run inside the caller's transaction so the item update
//! and the intake recomputation commit together.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::PipelineError;
use crate::db::{repository, Database, DatabaseError};
use crate::models::{ChecklistItem, DocKind, IntakeStatus};

#[derive(Debug, Clone, Serialize)]
pub struct IncrementOutcome {
    /// The updated slot; `None` when the intake expects no document of this kind.
    pub item: Option<ChecklistItem>,
    pub intake_status: IntakeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItemView {
    #[serde(flatten)]
    pub item: ChecklistItem,
    pub is_complete: bool,
    pub progress_percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistView {
    pub intake_id: Uuid,
    pub intake_status: IntakeStatus,
    pub is_complete: bool,
    pub items: Vec<ChecklistItemView>,
    pub total_expected: u32,
    pub total_received: u32,
    pub overall_progress: u32,
}

/// Count one extracted document of `kind` against the intake's checklist,
/// then recompute the intake status.
///
/// Kinds the template does not expect, and slots already full, leave the
/// quantities unchanged.
pub fn increment(
    conn: &Connection,
    intake_id: &Uuid,
    kind: DocKind,
) -> Result<IncrementOutcome, DatabaseError> {
    let item = match kind.checklist_kind() {
        Some(slot) => repository::increment_checklist_item(conn, intake_id, slot)?,
        None => None,
    };

    match &item {
        Some(item) => tracing::info!(
            intake_id = %intake_id,
            kind = kind.as_str(),
            received = item.quantity_received,
            expected = item.quantity_expected,
            "Checklist item updated"
        ),
        None => tracing::debug!(
            intake_id = %intake_id,
            kind = kind.as_str(),
            "No checklist slot for kind; nothing to count"
        ),
    }

    let intake_status = recompute_intake_status(conn, intake_id)?;
    Ok(IncrementOutcome {
        item,
        intake_status,
    })
}

/// `done` iff the intake has items and every one is received, else `open`.
pub fn recompute_intake_status(
    conn: &Connection,
    intake_id: &Uuid,
) -> Result<IntakeStatus, DatabaseError> {
    let (total, missing) = repository::checklist_counts(conn, intake_id)?;
    let status = derive_intake_status(total, missing);
    if repository::update_intake_status(conn, intake_id, status)? {
        tracing::info!(intake_id = %intake_id, status = status.as_str(), "Intake status changed");
    }
    Ok(status)
}

pub fn derive_intake_status(total_items: u32, missing_items: u32) -> IntakeStatus {
    if total_items > 0 && missing_items == 0 {
        IntakeStatus::Done
    } else {
        IntakeStatus::Open
    }
}

/// Current checklist with progress figures.
pub fn checklist_view(db: &Database, intake_id: &Uuid) -> Result<ChecklistView, PipelineError> {
    let (intake, items) = db.with_conn(|conn| {
        let intake = repository::get_intake(conn, intake_id)?
            .ok_or_else(|| PipelineError::not_found("Intake", *intake_id))?;
        let items = repository::list_checklist_items(conn, intake_id)?;
        Ok::<_, PipelineError>((intake, items))
    })?;
    Ok(build_view(intake.id, intake.status, items))
}

pub(crate) fn build_view(
    intake_id: Uuid,
    intake_status: IntakeStatus,
    items: Vec<ChecklistItem>,
) -> ChecklistView {
    let total_expected: u32 = items.iter().map(|i| i.quantity_expected).sum();
    let total_received: u32 = items.iter().map(|i| i.quantity_received).sum();
    let overall_progress = if total_expected == 0 {
        0
    } else {
        total_received * 100 / total_expected
    };

    ChecklistView {
        intake_id,
        intake_status,
        is_complete: intake_status == IntakeStatus::Done,
        items: items
            .into_iter()
            .map(|item| ChecklistItemView {
                is_complete: item.is_complete(),
                progress_percentage: item.progress_percentage(),
                item,
            })
            .collect(),
        total_expected,
        total_received,
        overall_progress,
    }
}
