//! Document upload, lookup and per-document processing.
//!
//! `POST /intakes/:id/documents` takes `multipart/form-data` with one `file`
//! part. The part's `Content-Type` is the declared media type; when the
//! client sends none (or `application/octet-stream`) the type is guessed
//! from the filename, then from the leading bytes.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::models::DocumentView;
use crate::pipeline::classification::ClassificationResult;
use crate::pipeline::extraction::ExtractionResult;
use crate::pipeline::import::{guess_media_type, Upload};

const FILE_FIELD: &str = "file";

/// `POST /intakes/:id/documents`: ingest one document.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Path(intake_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentView>), ApiError> {
    let intake_id = parse_id(&intake_id)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        upload = Some(build_upload(filename, declared, bytes));
        break;
    }
    let upload = upload
        .ok_or_else(|| ApiError::BadRequest(format!("multipart field '{FILE_FIELD}' is required")))?;

    let document = ctx.run(move |p| p.ingest(&intake_id, upload)).await?;
    Ok((StatusCode::CREATED, Json(document.into())))
}

fn build_upload(filename: String, declared: Option<String>, bytes: Vec<u8>) -> Upload {
    let declared_media_type = match declared {
        Some(ct) if !ct.trim().is_empty() && !ct.eq_ignore_ascii_case("application/octet-stream") => ct,
        _ => guess_media_type(&filename, &bytes)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    };
    Upload {
        filename,
        declared_media_type,
        bytes,
    }
}

/// `GET /documents/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, ApiError> {
    let id = parse_id(&id)?;
    let document = ctx.run(move |p| p.get_document(&id)).await?;
    Ok(Json(document.into()))
}

/// `POST /documents/:id/classify`
pub async fn classify(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let id = parse_id(&id)?;
    let result = ctx.run(move |p| p.classify_one(&id)).await?;
    Ok(Json(result))
}

/// `POST /documents/:id/extract`
pub async fn extract(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let id = parse_id(&id)?;
    let result = ctx.run(move |p| p.extract_one(&id)).await?;
    Ok(Json(result))
}
