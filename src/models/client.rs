use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Complexity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Frozen at creation; there is no update path.
    pub complexity: Complexity,
    pub created_at: DateTime<Utc>,
}
