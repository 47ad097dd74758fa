use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::IntakeStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intake {
    pub id: Uuid,
    pub client_id: Uuid,
    pub fiscal_year: i32,
    pub status: IntakeStatus,
    pub created_at: DateTime<Utc>,
}

impl Intake {
    pub fn is_complete(&self) -> bool {
        self.status == IntakeStatus::Done
    }
}
