//! Shared types for the HTTP layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::pipeline::{IntakePipeline, PipelineError};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Run a blocking workflow operation off the async runtime.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&IntakePipeline) -> Result<T, PipelineError> + Send + 'static,
    {
        let pipeline = self.core.pipeline();
        let result = tokio::task::spawn_blocking(move || op(&pipeline)).await?;
        Ok(result?)
    }
}

/// Parse a path identifier.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid ID format: {raw}")))
}
