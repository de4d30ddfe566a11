use std::sync::Arc;

use taskdeck_application::{DocumentStore, FeedbackGuardService};
use taskdeck_core::{AppError, AppResult};
use taskdeck_infrastructure::{
    AppwriteDocumentStore, InMemoryDocumentStore, PostgresDocumentStore, RedisDocumentStore,
};

use crate::api_config::{ApiConfig, DocumentStoreConfig};
use crate::state::AppState;

use super::database::connect_and_migrate;

pub async fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let document_store = build_document_store(&config.document_store).await?;

    Ok(AppState {
        feedback_guard_service: FeedbackGuardService::new(document_store, config.feedback_limits),
    })
}

async fn build_document_store(config: &DocumentStoreConfig) -> AppResult<Arc<dyn DocumentStore>> {
    Ok(match config {
        DocumentStoreConfig::InMemory => Arc::new(InMemoryDocumentStore::new()),
        DocumentStoreConfig::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url).await?;
            Arc::new(PostgresDocumentStore::new(pool))
        }
        DocumentStoreConfig::Redis {
            redis_url,
            key_prefix,
        } => {
            let client = redis::Client::open(redis_url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL for DOCUMENT_STORE=redis: {error}"))
            })?;
            Arc::new(RedisDocumentStore::new(client, key_prefix.as_str()))
        }
        DocumentStoreConfig::Appwrite(appwrite) => Arc::new(AppwriteDocumentStore::new(
            reqwest::Client::new(),
            appwrite.clone(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_needs_no_external_services() {
        let config = ApiConfig::from_lookup(false, |_| None)
            .unwrap_or_else(|error| panic!("config: {error}"));

        assert!(build_app_state(&config).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_redis_url_is_a_validation_error() {
        let config = DocumentStoreConfig::Redis {
            redis_url: "not a url".to_owned(),
            key_prefix: "taskdeck:documents".to_owned(),
        };

        assert!(matches!(
            build_document_store(&config).await,
            Err(AppError::Validation(_))
        ));
    }
}
