use std::process::ExitCode;
use std::sync::Arc;

use taxintake::config::{self, AppConfig};
use taxintake::core_state::CoreState;

#[tokio::main]
async fn main() -> ExitCode {
    taxintake::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env();
    let bind = config.bind;

    let core = match tokio::task::spawn_blocking(move || CoreState::from_config(config)).await {
        Ok(Ok(core)) => Arc::new(core),
        Ok(Err(e)) => {
            tracing::error!("Startup failed: {e}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::error!("Startup task failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let served = taxintake::api::serve(core.clone(), bind, taxintake::api::shutdown_signal()).await;

    // The blocking HTTP client inside the vision collaborators must not be
    // dropped on an async worker.
    let _ = tokio::task::spawn_blocking(move || drop(core)).await;

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(%bind, "Server error: {e}");
            ExitCode::FAILURE
        }
    }
}
