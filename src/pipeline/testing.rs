//! Fixtures shared by the workflow tests.

use uuid::Uuid;

use super::clients::{create_client, NewClient};
use super::import::{ingest_document, Upload};
use super::intakes::{create_intake, NewIntake};
use super::storage::BlobStore;
use crate::db::Database;
use crate::models::{Complexity, Document};

pub const UPLOAD_LIMIT: u64 = 1024 * 1024;

/// Fresh client of `complexity` with one 2024 intake.
pub fn seed_intake(db: &Database, complexity: Complexity) -> Uuid {
    let client = create_client(
        db,
        NewClient {
            name: "Ada Tremblay".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            complexity,
        },
    )
    .unwrap();
    create_intake(
        db,
        NewIntake {
            client_id: client.id,
            fiscal_year: 2024,
        },
    )
    .unwrap()
    .id
}

pub fn upload_png(db: &Database, blobs: &dyn BlobStore, intake_id: &Uuid, bytes: &[u8]) -> Document {
    ingest_document(
        db,
        blobs,
        UPLOAD_LIMIT,
        intake_id,
        Upload {
            filename: "scan.png".into(),
            declared_media_type: "image/png".into(),
            bytes: bytes.to_vec(),
        },
    )
    .unwrap()
}
