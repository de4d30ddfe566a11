//! Redis-backed document store.
//!
//! Each document is one JSON string under `<prefix>:<collection>:<id>`.
//! Permissions are not enforced by this adapter and are dropped.
//!
//! Updates merge in Rust under `WATCH`/`MULTI` so stored JSON keeps its
//! exact shape. A concurrent write to the same key aborts the transaction
//! and the merge is retried.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;
use taskdeck_application::{
    Collection, Document, DocumentFields, DocumentId, DocumentPermission, DocumentStore,
};
use taskdeck_core::{AppError, AppResult};

const MAX_MERGE_ATTEMPTS: usize = 8;

/// Redis implementation of the document store port.
#[derive(Clone)]
pub struct RedisDocumentStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisDocumentStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, collection: Collection, document_id: &str) -> String {
        format!("{}:{collection}:{document_id}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn get_document(
        &self,
        collection: Collection,
        document_id: &str,
    ) -> AppResult<Option<Document>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection
            .get(self.key_for(collection, document_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to load redis document '{document_id}' from '{collection}': {error}"
                ))
            })?;

        encoded
            .map(|encoded| decode_document(collection, document_id, encoded.as_str()))
            .transpose()
    }

    async fn create_document(
        &self,
        collection: Collection,
        document_id: DocumentId,
        fields: DocumentFields,
        _permissions: &[DocumentPermission],
    ) -> AppResult<Document> {
        let id = match document_id {
            DocumentId::Custom(id) => id,
            DocumentId::Generated => uuid::Uuid::new_v4().simple().to_string(),
        };
        let encoded = Value::Object(fields.clone()).to_string();

        let mut connection = self.connection().await?;
        let created: Option<String> = redis::cmd("SET")
            .arg(self.key_for(collection, id.as_str()))
            .arg(encoded)
            .arg("NX")
            .query_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to create redis document '{id}' in '{collection}': {error}"
                ))
            })?;

        if created.is_none() {
            return Err(AppError::Conflict(format!(
                "document '{id}' already exists in collection '{collection}'"
            )));
        }

        Ok(Document { id, fields })
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        fields: DocumentFields,
    ) -> AppResult<Document> {
        let key = self.key_for(collection, document_id);
        let update_error = |error: redis::RedisError| {
            AppError::Internal(format!(
                "failed to update redis document '{document_id}' in '{collection}': {error}"
            ))
        };

        // WATCH state is per connection; this connection is not shared.
        let mut connection = self.connection().await?;
        for _ in 0..MAX_MERGE_ATTEMPTS {
            redis::cmd("WATCH")
                .arg(key.as_str())
                .query_async::<()>(&mut connection)
                .await
                .map_err(update_error)?;

            let current: Option<String> = connection
                .get(key.as_str())
                .await
                .map_err(update_error)?;
            let Some(current) = current else {
                redis::cmd("UNWATCH")
                    .query_async::<()>(&mut connection)
                    .await
                    .map_err(update_error)?;
                return Err(AppError::NotFound(format!(
                    "document '{document_id}' does not exist in collection '{collection}'"
                )));
            };

            let mut document = decode_document(collection, document_id, current.as_str())?;
            merge_fields(&mut document.fields, fields.clone());

            let committed: Option<Vec<redis::Value>> = redis::pipe()
                .atomic()
                .set(key.as_str(), Value::Object(document.fields.clone()).to_string())
                .query_async(&mut connection)
                .await
                .map_err(update_error)?;
            if committed.is_some() {
                return Ok(document);
            }
        }

        Err(AppError::Internal(format!(
            "gave up updating redis document '{document_id}' in '{collection}' after {MAX_MERGE_ATTEMPTS} concurrent modifications"
        )))
    }
}

/// Shallow merge: top-level attributes in `patch` replace stored ones.
fn merge_fields(document: &mut DocumentFields, patch: DocumentFields) {
    document.extend(patch);
}

fn decode_document(collection: Collection, document_id: &str, encoded: &str) -> AppResult<Document> {
    match serde_json::from_str::<Value>(encoded) {
        Ok(Value::Object(fields)) => Ok(Document {
            id: document_id.to_owned(),
            fields,
        }),
        Ok(_) => Err(AppError::Internal(format!(
            "redis document '{document_id}' in '{collection}' is not a JSON object"
        ))),
        Err(error) => Err(AppError::Internal(format!(
            "redis document '{document_id}' in '{collection}' is not valid JSON: {error}"
        ))),
    }
}
