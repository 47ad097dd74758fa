//! HTTP surface.
//!
//! Thin axum layer over `IntakePipeline`: handlers parse input, run the
//! blocking workflow operation on the blocking pool and map
//! `PipelineError` to a status code and a JSON error body.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, shutdown_signal};
pub use types::ApiContext;
