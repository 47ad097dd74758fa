//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` (or a `Transaction`, which
//! derefs to one) so callers decide the transactional scope.

mod checklist;
mod client;
mod document;
mod intake;

use uuid::Uuid;

use super::DatabaseError;

pub use checklist::*;
pub use client::*;
pub use document::*;
pub use intake::*;

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| {
        DatabaseError::ConstraintViolation(format!("invalid {field} '{value}': {e}"))
    })
}
