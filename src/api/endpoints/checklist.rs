use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::pipeline::checklist::ChecklistView;

/// `GET /intakes/:id/checklist`: items, progress and intake status.
pub async fn view(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ChecklistView>, ApiError> {
    let id = parse_id(&id)?;
    let view = ctx.run(move |p| p.checklist(&id)).await?;
    Ok(Json(view))
}
