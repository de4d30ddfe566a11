use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use taskdeck_core::AppError;
use taskdeck_infrastructure::MIGRATOR;

/// Opens the document store pool and brings the `documents` table up to date.
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to connect to document database: {error}"))
        })?;

    MIGRATOR.run(&pool).await.map_err(|error| {
        AppError::Internal(format!("failed to migrate documents table: {error}"))
    })?;

    Ok(pool)
}
