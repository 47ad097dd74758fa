//! Intake lifecycle and per-intake batch endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::models::DocumentView;
use crate::pipeline::batch::BatchReport;
use crate::pipeline::intakes::{IntakeView, NewIntake};

/// `POST /intakes`: open an intake and materialize its checklist.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewIntake>, JsonRejection>,
) -> Result<(StatusCode, Json<IntakeView>), ApiError> {
    let Json(input) = payload?;
    let intake = ctx.run(move |p| p.create_intake(input)).await?;
    Ok((StatusCode::CREATED, Json(intake.into())))
}

/// `GET /intakes/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<IntakeView>, ApiError> {
    let id = parse_id(&id)?;
    let intake = ctx.run(move |p| p.get_intake(&id)).await?;
    Ok(Json(intake.into()))
}

/// `GET /intakes/:id/documents`: documents in upload order.
pub async fn documents(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DocumentView>>, ApiError> {
    let id = parse_id(&id)?;
    let documents = ctx.run(move |p| p.list_documents(&id)).await?;
    Ok(Json(documents.into_iter().map(DocumentView::from).collect()))
}

/// `POST /intakes/:id/classify`: classify every unclassified document.
pub async fn classify_all(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<BatchReport>, ApiError> {
    let id = parse_id(&id)?;
    let report = ctx.run(move |p| p.classify_all(&id)).await?;
    Ok(Json(report))
}

/// `POST /intakes/:id/extract`: extract every classified, unextracted document.
pub async fn extract_all(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<BatchReport>, ApiError> {
    let id = parse_id(&id)?;
    let report = ctx.run(move |p| p.extract_all(&id)).await?;
    Ok(Json(report))
}
