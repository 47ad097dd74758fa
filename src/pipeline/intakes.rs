//! Intake lifecycle: creation with its checklist, lookups.
//!
//! The open -> done transition lives in `checklist::recompute_intake_status`
//! and nowhere else.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{template, PipelineError};
use crate::db::{repository, Database};
use crate::models::{ChecklistItem, ChecklistStatus, Document, Intake, IntakeStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct NewIntake {
    pub client_id: Uuid,
    pub fiscal_year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeView {
    #[serde(flatten)]
    pub intake: Intake,
    pub is_complete: bool,
}

impl From<Intake> for IntakeView {
    fn from(intake: Intake) -> Self {
        Self {
            is_complete: intake.is_complete(),
            intake,
        }
    }
}

/// Create an open intake and materialize its checklist in one transaction.
pub fn create_intake(db: &Database, input: NewIntake) -> Result<Intake, PipelineError> {
    if input.fiscal_year <= 0 {
        return Err(PipelineError::Validation(format!(
            "fiscal_year must be positive, got {}",
            input.fiscal_year
        )));
    }

    let (intake, item_count) = db.with_transaction(|tx| {
        let client = repository::get_client(tx, &input.client_id)?
            .ok_or_else(|| PipelineError::not_found("Client", input.client_id))?;

        let duplicate = || PipelineError::DuplicateIntake {
            client_id: client.id,
            fiscal_year: input.fiscal_year,
        };
        if repository::get_intake_for_year(tx, &client.id, input.fiscal_year)?.is_some() {
            return Err(duplicate());
        }

        let intake = Intake {
            id: Uuid::new_v4(),
            client_id: client.id,
            fiscal_year: input.fiscal_year,
            status: IntakeStatus::Open,
            created_at: Utc::now(),
        };
        repository::insert_intake(tx, &intake).map_err(|e| {
            if e.is_unique_violation() {
                duplicate()
            } else {
                e.into()
            }
        })?;

        let expected = template::resolve(client.complexity);
        for (position, entry) in expected.iter().enumerate() {
            repository::insert_checklist_item(
                tx,
                &ChecklistItem {
                    id: Uuid::new_v4(),
                    intake_id: intake.id,
                    doc_kind: entry.doc_kind,
                    position: position as u32,
                    quantity_expected: entry.quantity,
                    quantity_received: 0,
                    status: ChecklistStatus::Missing,
                },
            )?;
        }
        Ok((intake, expected.len()))
    })?;

    tracing::info!(
        intake_id = %intake.id,
        client_id = %intake.client_id,
        fiscal_year = intake.fiscal_year,
        checklist_items = item_count,
        "Intake created"
    );
    Ok(intake)
}

pub fn get_intake(db: &Database, id: &Uuid) -> Result<Intake, PipelineError> {
    db.with_conn(|conn| repository::get_intake(conn, id).map_err(PipelineError::from))?
        .ok_or_else(|| PipelineError::not_found("Intake", *id))
}

/// Documents of an intake in upload order.
pub fn list_documents(db: &Database, intake_id: &Uuid) -> Result<Vec<Document>, PipelineError> {
    db.with_conn(|conn| {
        if !repository::intake_exists(conn, intake_id)? {
            return Err(PipelineError::not_found("Intake", *intake_id));
        }
        Ok(repository::list_documents(conn, intake_id)?)
    })
}
