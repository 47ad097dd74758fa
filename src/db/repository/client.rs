use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Client, Complexity};

struct ClientRow {
    id: String,
    name: String,
    email: String,
    complexity: String,
    created_at: DateTime<Utc>,
}

const CLIENT_COLUMNS: &str = "id, name, email, complexity, created_at";

pub fn insert_client(conn: &Connection, client: &Client) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clients (id, name, email, complexity, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            client.id.to_string(),
            client.name,
            client.email,
            client.complexity.as_str(),
            client.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_client(conn: &Connection, id: &Uuid) -> Result<Option<Client>, DatabaseError> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], read_row)
        .optional()?
        .map(client_from_row)
        .transpose()
}

/// Lookup by normalized (lowercased) email.
pub fn get_client_by_email(conn: &Connection, email: &str) -> Result<Option<Client>, DatabaseError> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE email = ?1");
    conn.query_row(&sql, params![email], read_row)
        .optional()?
        .map(client_from_row)
        .transpose()
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientRow> {
    Ok(ClientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        complexity: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn client_from_row(row: ClientRow) -> Result<Client, DatabaseError> {
    Ok(Client {
        id: parse_uuid("client id", &row.id)?,
        name: row.name,
        email: row.email,
        complexity: Complexity::from_str(&row.complexity)?,
        created_at: row.created_at,
    })
}
