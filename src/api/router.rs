use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Headroom on top of the upload limit for multipart framing and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let body_limit = usize::try_from(core.config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/clients", post(endpoints::clients::create))
        .route("/clients/:id", get(endpoints::clients::detail))
        .route("/intakes", post(endpoints::intakes::create))
        .route("/intakes/:id", get(endpoints::intakes::detail))
        .route(
            "/intakes/:id/documents",
            get(endpoints::intakes::documents).post(endpoints::documents::upload),
        )
        .route("/intakes/:id/classify", post(endpoints::intakes::classify_all))
        .route("/intakes/:id/extract", post(endpoints::intakes::extract_all))
        .route("/intakes/:id/checklist", get(endpoints::checklist::view))
        .route("/documents/:id", get(endpoints::documents::detail))
        .route("/documents/:id/classify", post(endpoints::documents::classify))
        .route("/documents/:id/extract", post(endpoints::documents::extract))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
