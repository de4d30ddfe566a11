//! PostgreSQL-backed document store using the `documents` table.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use taskdeck_application::{
    Collection, Document, DocumentFields, DocumentId, DocumentPermission, DocumentStore,
};
use taskdeck_core::{AppError, AppResult};

/// PostgreSQL implementation of the document store port.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get_document(
        &self,
        collection: Collection,
        document_id: &str,
    ) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load document '{document_id}' from '{collection}': {error}"
            ))
        })?;

        row.map(|row| document_from_row(collection, row)).transpose()
    }

    async fn create_document(
        &self,
        collection: Collection,
        document_id: DocumentId,
        fields: DocumentFields,
        permissions: &[DocumentPermission],
    ) -> AppResult<Document> {
        let id = match document_id {
            DocumentId::Custom(id) => id,
            DocumentId::Generated => uuid::Uuid::new_v4().simple().to_string(),
        };
        let permissions: Vec<String> = permissions
            .iter()
            .map(|permission| permission.as_str().to_owned())
            .collect();

        // ON CONFLICT DO NOTHING returns no row when the id is taken.
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (collection, id, data, permissions)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, id) DO NOTHING
            RETURNING id, data
            "#,
        )
        .bind(collection.as_str())
        .bind(id.as_str())
        .bind(Value::Object(fields))
        .bind(permissions)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to create document '{id}' in '{collection}': {error}"
            ))
        })?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "document '{id}' already exists in collection '{collection}'"
            ))
        })?;

        document_from_row(collection, row)
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        fields: DocumentFields,
    ) -> AppResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING id, data
            "#,
        )
        .bind(collection.as_str())
        .bind(document_id)
        .bind(Value::Object(fields))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update document '{document_id}' in '{collection}': {error}"
            ))
        })?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "document '{document_id}' does not exist in collection '{collection}'"
            ))
        })?;

        document_from_row(collection, row)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Value,
}

fn document_from_row(collection: Collection, row: DocumentRow) -> AppResult<Document> {
    match row.data {
        Value::Object(fields) => Ok(Document { id: row.id, fields }),
        other => Err(AppError::Internal(format!(
            "document '{}' in '{collection}' has non-object data: {other}",
            row.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::MIGRATOR;

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres document tests: {error}");
        }

        Some(pool)
    }

    fn fields(value: Value) -> DocumentFields {
        match value {
            Value::Object(fields) => fields,
            _ => DocumentFields::new(),
        }
    }

    fn unique_id(label: &str) -> String {
        format!("{label}-{}", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let store = PostgresDocumentStore::new(pool);
        let id = unique_id("profile");

        let first = store
            .create_document(
                Collection::Profiles,
                DocumentId::Custom(id.clone()),
                fields(json!({ "suspendedUntil": "" })),
                &[DocumentPermission::read_user(id.as_str())],
            )
            .await;
        let second = store
            .create_document(
                Collection::Profiles,
                DocumentId::Custom(id.clone()),
                DocumentFields::new(),
                &[],
            )
            .await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let store = PostgresDocumentStore::new(pool);

        let result = store
            .update_document(
                Collection::Presence,
                unique_id("ghost").as_str(),
                fields(json!({ "feedbackWindowCount": 1 })),
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_merges_and_keeps_unrelated_keys() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let store = PostgresDocumentStore::new(pool);
        let id = unique_id("presence");

        let created = store
            .create_document(
                Collection::Presence,
                DocumentId::Custom(id.clone()),
                fields(json!({
                    "feedbackWindowCount": 1,
                    "onlineStatus": "online",
                    "tags": []
                })),
                &[],
            )
            .await;
        assert!(created.is_ok());

        let updated = store
            .update_document(
                Collection::Presence,
                id.as_str(),
                fields(json!({ "feedbackWindowCount": 2 })),
            )
            .await
            .unwrap_or_else(|error| panic!("update failed: {error}"));
        assert_eq!(updated.fields.get("feedbackWindowCount"), Some(&json!(2)));

        let loaded = store
            .get_document(Collection::Presence, id.as_str())
            .await
            .unwrap_or_else(|error| panic!("load failed: {error}"))
            .unwrap_or_else(|| panic!("document should exist"));
        assert_eq!(loaded.fields.get("onlineStatus"), Some(&json!("online")));
        assert_eq!(loaded.fields.get("tags"), Some(&json!([])));
    }

    #[tokio::test]
    async fn generated_ids_are_assigned() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let store = PostgresDocumentStore::new(pool);

        let created = store
            .create_document(
                Collection::Notifications,
                DocumentId::Generated,
                fields(json!({ "type": "feedback_rate_limited" })),
                &[],
            )
            .await
            .unwrap_or_else(|error| panic!("create failed: {error}"));

        assert!(!created.id.is_empty());
        assert!(
            store
                .get_document(Collection::Notifications, created.id.as_str())
                .await
                .is_ok_and(|document| document.is_some())
        );
    }
}
