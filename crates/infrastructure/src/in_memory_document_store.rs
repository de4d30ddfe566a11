use std::collections::HashMap;

use async_trait::async_trait;
use taskdeck_application::{
    Collection, Document, DocumentFields, DocumentId, DocumentPermission, DocumentStore,
};
use taskdeck_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// In-memory document store for local development and tests.
///
/// Permissions are accepted and discarded.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<(Collection, String), DocumentFields>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many documents a collection holds.
    pub async fn count(&self, collection: Collection) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(stored_collection, _)| *stored_collection == collection)
            .count()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(
        &self,
        collection: Collection,
        document_id: &str,
    ) -> AppResult<Option<Document>> {
        Ok(self
            .documents
            .read()
            .await
            .get(&(collection, document_id.to_owned()))
            .map(|fields| Document {
                id: document_id.to_owned(),
                fields: fields.clone(),
            }))
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

        let mut documents = self.documents.write().await;
        let key = (collection, id.clone());
        if documents.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "document '{id}' already exists in collection '{collection}'"
            )));
        }

        documents.insert(key, fields.clone());
        Ok(Document { id, fields })
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        fields: DocumentFields,
    ) -> AppResult<Document> {
        let mut documents = self.documents.write().await;
        let existing = documents
            .get_mut(&(collection, document_id.to_owned()))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "document '{document_id}' does not exist in collection '{collection}'"
                ))
            })?;

        existing.extend(fields);
        Ok(Document {
            id: document_id.to_owned(),
            fields: existing.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn fields(value: Value) -> DocumentFields {
        match value {
            Value::Object(fields) => fields,
            _ => DocumentFields::new(),
        }
    }

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let store = InMemoryDocumentStore::new();
        let document = store.get_document(Collection::Profiles, "nobody").await;
        assert!(matches!(document, Ok(None)));
    }

    #[tokio::test]
    async fn update_merges_into_existing_fields() {
        let store = InMemoryDocumentStore::new();
        let created = store
            .create_document(
                Collection::Presence,
                DocumentId::Custom("user-1".to_owned()),
                fields(json!({ "feedbackWindowCount": 1, "status": "online" })),
                &[],
            )
            .await;
        assert!(created.is_ok());

        let updated = store
            .update_document(
                Collection::Presence,
                "user-1",
                fields(json!({ "feedbackWindowCount": 2 })),
            )
            .await
            .unwrap_or_else(|error| panic!("update failed: {error}"));

        assert_eq!(updated.fields.get("feedbackWindowCount"), Some(&json!(2)));
        assert_eq!(updated.fields.get("status"), Some(&json!("online")));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .update_document(Collection::Presence, "ghost", DocumentFields::new())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_custom_id_conflicts() {
        let store = InMemoryDocumentStore::new();
        let id = || DocumentId::Custom("user-2".to_owned());

        let first = store
            .create_document(Collection::Profiles, id(), DocumentFields::new(), &[])
            .await;
        let second = store
            .create_document(Collection::Profiles, id(), DocumentFields::new(), &[])
            .await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn generated_ids_are_unique_per_collection() {
        let store = InMemoryDocumentStore::new();
        for _ in 0..3 {
            let result = store
                .create_document(
                    Collection::Notifications,
                    DocumentId::Generated,
                    DocumentFields::new(),
                    &[],
                )
                .await;
            assert!(result.is_ok());
        }

        assert_eq!(store.count(Collection::Notifications).await, 3);
        assert_eq!(store.count(Collection::Profiles).await, 0);
    }
}
