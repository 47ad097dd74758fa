use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Intake, IntakeStatus};

struct IntakeRow {
    id: String,
    client_id: String,
    fiscal_year: i32,
    status: String,
    created_at: DateTime<Utc>,
}

const INTAKE_COLUMNS: &str = "id, client_id, fiscal_year, status, created_at";

pub fn insert_intake(conn: &Connection, intake: &Intake) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO intakes (id, client_id, fiscal_year, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            intake.id.to_string(),
            intake.client_id.to_string(),
            intake.fiscal_year,
            intake.status.as_str(),
            intake.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_intake(conn: &Connection, id: &Uuid) -> Result<Option<Intake>, DatabaseError> {
    let sql = format!("SELECT {INTAKE_COLUMNS} FROM intakes WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], read_row)
        .optional()?
        .map(intake_from_row)
        .transpose()
}

pub fn get_intake_for_year(
    conn: &Connection,
    client_id: &Uuid,
    fiscal_year: i32,
) -> Result<Option<Intake>, DatabaseError> {
    let sql = format!(
        "SELECT {INTAKE_COLUMNS} FROM intakes WHERE client_id = ?1 AND fiscal_year = ?2"
    );
    conn.query_row(&sql, params![client_id.to_string(), fiscal_year], read_row)
        .optional()?
        .map(intake_from_row)
        .transpose()
}

pub fn intake_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM intakes WHERE id = ?1",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Write the intake status. Returns `true` when the stored value changed.
pub fn update_intake_status(
    conn: &Connection,
    id: &Uuid,
    status: IntakeStatus,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "UPDATE intakes SET status = ?2 WHERE id = ?1 AND status <> ?2",
        params![id.to_string(), status.as_str()],
    )?;
    Ok(rows > 0)
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IntakeRow> {
    Ok(IntakeRow {
        id: row.get(0)?,
        client_id: row.get(1)?,
        fiscal_year: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn intake_from_row(row: IntakeRow) -> Result<Intake, DatabaseError> {
    Ok(Intake {
        id: parse_uuid("intake id", &row.id)?,
        client_id: parse_uuid("client id", &row.client_id)?,
        fiscal_year: row.fiscal_year,
        status: IntakeStatus::from_str(&row.status)?,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_client;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Client, Complexity};

    fn seed_client(conn: &Connection) -> Uuid {
        let client = Client {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            complexity: Complexity::Simple,
            created_at: Utc::now(),
        };
        insert_client(conn, &client).unwrap();
        client.id
    }

    fn intake(client_id: Uuid, year: i32) -> Intake {
        Intake {
            id: Uuid::new_v4(),
            client_id,
            fiscal_year: year,
            status: IntakeStatus::Open,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get() {
        let conn = open_memory_database().unwrap();
        let client_id = seed_client(&conn);
        let i = intake(client_id, 2024);
        insert_intake(&conn, &i).unwrap();

        let loaded = get_intake(&conn, &i.id).unwrap().unwrap();
        assert_eq!(loaded.client_id, client_id);
        assert_eq!(loaded.status, IntakeStatus::Open);
        assert!(intake_exists(&conn, &i.id).unwrap());
        assert!(!intake_exists(&conn, &Uuid::new_v4()).unwrap());
    }

    #[test]
    fn one_intake_per_client_year() {
        let conn = open_memory_database().unwrap();
        let client_id = seed_client(&conn);
        insert_intake(&conn, &intake(client_id, 2024)).unwrap();
        let err = insert_intake(&conn, &intake(client_id, 2024)).unwrap_err();
        assert!(err.is_unique_violation());
        insert_intake(&conn, &intake(client_id, 2023)).unwrap();
        assert!(get_intake_for_year(&conn, &client_id, 2023).unwrap().is_some());
    }

    #[test]
    fn unknown_client_violates_foreign_key() {
        let conn = open_memory_database().unwrap();
        assert!(insert_intake(&conn, &intake(Uuid::new_v4(), 2024)).is_err());
    }

    #[test]
    fn status_update_reports_change() {
        let conn = open_memory_database().unwrap();
        let client_id = seed_client(&conn);
        let i = intake(client_id, 2024);
        insert_intake(&conn, &i).unwrap();

        assert!(!update_intake_status(&conn, &i.id, IntakeStatus::Open).unwrap());
        assert!(update_intake_status(&conn, &i.id, IntakeStatus::Done).unwrap());
        assert!(!update_intake_status(&conn, &i.id, IntakeStatus::Done).unwrap());
    }
}
