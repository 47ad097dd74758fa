use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{ChecklistItem, ChecklistKind, ChecklistStatus};

struct ChecklistRow {
    id: String,
    intake_id: String,
    doc_kind: String,
    position: u32,
    quantity_expected: u32,
    quantity_received: u32,
    status: String,
}

const ITEM_COLUMNS: &str =
    "id, intake_id, doc_kind, position, quantity_expected, quantity_received, status";

pub fn insert_checklist_item(conn: &Connection, item: &ChecklistItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO checklist_items
         (id, intake_id, doc_kind, position, quantity_expected, quantity_received, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id.to_string(),
            item.intake_id.to_string(),
            item.doc_kind.as_str(),
            item.position,
            item.quantity_expected,
            item.quantity_received,
            item.status.as_str(),
        ],
    )?;
    Ok(())
}

/// Items of one intake in template order.
pub fn list_checklist_items(
    conn: &Connection,
    intake_id: &Uuid,
) -> Result<Vec<ChecklistItem>, DatabaseError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM checklist_items WHERE intake_id = ?1 ORDER BY position"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![intake_id.to_string()], read_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(item_from_row(row?)?);
    }
    Ok(items)
}

pub fn get_checklist_item(
    conn: &Connection,
    intake_id: &Uuid,
    kind: ChecklistKind,
) -> Result<Option<ChecklistItem>, DatabaseError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM checklist_items WHERE intake_id = ?1 AND doc_kind = ?2"
    );
    conn.query_row(&sql, params![intake_id.to_string(), kind.as_str()], read_row)
        .optional()?
        .map(item_from_row)
        .transpose()
}

/// Bump `quantity_received` by one, capped at `quantity_expected`, and
/// re-derive the item status in the same statement.
///
/// Returns the updated item, or `None` when the intake has no slot for
/// `kind`. A full slot stays full.
pub fn increment_checklist_item(
    conn: &Connection,
    intake_id: &Uuid,
    kind: ChecklistKind,
) -> Result<Option<ChecklistItem>, DatabaseError> {
    let rows = conn.execute(
        "UPDATE checklist_items
         SET quantity_received = MIN(quantity_received + 1, quantity_expected),
             status = CASE
                 WHEN MIN(quantity_received + 1, quantity_expected) >= quantity_expected
                 THEN ?3 ELSE ?4 END
         WHERE intake_id = ?1 AND doc_kind = ?2",
        params![
            intake_id.to_string(),
            kind.as_str(),
            ChecklistStatus::Received.as_str(),
            ChecklistStatus::Missing.as_str(),
        ],
    )?;
    if rows == 0 {
        return Ok(None);
    }
    get_checklist_item(conn, intake_id, kind)
}

/// `(total items, items still missing)` for one intake.
pub fn checklist_counts(conn: &Connection, intake_id: &Uuid) -> Result<(u32, u32), DatabaseError> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = ?2 THEN 0 ELSE 1 END), 0)
         FROM checklist_items WHERE intake_id = ?1",
        params![intake_id.to_string(), ChecklistStatus::Received.as_str()],
        |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
    )?;
    Ok(counts)
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChecklistRow> {
    Ok(ChecklistRow {
        id: row.get(0)?,
        intake_id: row.get(1)?,
        doc_kind: row.get(2)?,
        position: row.get(3)?,
        quantity_expected: row.get(4)?,
        quantity_received: row.get(5)?,
        status: row.get(6)?,
    })
}

fn item_from_row(row: ChecklistRow) -> Result<ChecklistItem, DatabaseError> {
    Ok(ChecklistItem {
        id: parse_uuid("checklist item id", &row.id)?,
        intake_id: parse_uuid("intake id", &row.intake_id)?,
        doc_kind: ChecklistKind::from_str(&row.doc_kind)?,
        position: row.position,
        quantity_expected: row.quantity_expected,
        quantity_received: row.quantity_received,
        status: ChecklistStatus::from_str(&row.status)?,
    })
}
