//! Client registry endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::pipeline::clients::{ClientView, NewClient};

/// `POST /clients`: register a client.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> Result<(StatusCode, Json<ClientView>), ApiError> {
    let Json(input) = payload?;
    let client = ctx.run(move |p| p.create_client(input)).await?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

/// `GET /clients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ClientView>, ApiError> {
    let id = parse_id(&id)?;
    let client = ctx.run(move |p| p.get_client(&id)).await?;
    Ok(Json(client.into()))
}
