//! Taskdeck API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod state;

use taskdeck_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, DocumentStoreConfig, init_tracing};
use crate::api_router::build_router;
use crate::api_services::{build_app_state, connect_and_migrate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    if config.migrate_only {
        let DocumentStoreConfig::Postgres { database_url } = &config.document_store else {
            return Err(AppError::Validation(
                "migrate requires DOCUMENT_STORE=postgres".to_owned(),
            ));
        };
        connect_and_migrate(database_url).await?;
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = build_app_state(&config).await?;
    let app = build_router(app_state, &config.frontend_url)?;
    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        document_store = config.document_store.kind(),
        window_ms = config.feedback_limits.window_ms(),
        max_actions = config.feedback_limits.max_actions(),
        "taskdeck-api listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
