//! Client registry. Complexity is frozen at creation; nothing updates it.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{template, PipelineError};
use crate::db::{repository, Database};
use crate::models::{Client, Complexity};

const MAX_NAME_CHARS: usize = 255;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub complexity: Complexity,
}

/// Client plus the document counts its template implies.
#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    #[serde(flatten)]
    pub client: Client,
    pub expected_document_count: u32,
    pub expected_receipt_count: u32,
}

impl From<Client> for ClientView {
    fn from(client: Client) -> Self {
        Self {
            expected_document_count: template::expected_document_count(client.complexity),
            expected_receipt_count: template::expected_receipt_count(client.complexity),
            client,
        }
    }
}

pub fn create_client(db: &Database, input: NewClient) -> Result<Client, PipelineError> {
    let name = normalize_name(&input.name)?;
    let email = normalize_email(&input.email)?;

    let client = Client {
        id: Uuid::new_v4(),
        name,
        email,
        complexity: input.complexity,
        created_at: Utc::now(),
    };

    db.with_conn(|conn| {
        if repository::get_client_by_email(conn, &client.email)?.is_some() {
            return Err(PipelineError::DuplicateEmail(client.email.clone()));
        }
        repository::insert_client(conn, &client).map_err(|e| {
            if e.is_unique_violation() {
                PipelineError::DuplicateEmail(client.email.clone())
            } else {
                e.into()
            }
        })
    })?;

    tracing::info!(
        client_id = %client.id,
        complexity = client.complexity.as_str(),
        "Client created"
    );
    Ok(client)
}

pub fn get_client(db: &Database, id: &Uuid) -> Result<Client, PipelineError> {
    db.with_conn(|conn| repository::get_client(conn, id).map_err(PipelineError::from))?
        .ok_or_else(|| PipelineError::not_found("Client", *id))
}

fn normalize_name(raw: &str) -> Result<String, PipelineError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PipelineError::Validation("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(PipelineError::Validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn normalize_email(raw: &str) -> Result<String, PipelineError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(PipelineError::Validation(format!("invalid email address: {raw}")));
    }
    Ok(email)
}
