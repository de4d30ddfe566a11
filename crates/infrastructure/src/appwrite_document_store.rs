//! Appwrite Databases REST adapter.
//!
//! Talks to `/databases/{database}/collections/{collection}/documents` with a
//! server API key. Appwrite system attributes (`$id`, `$createdAt`, ...) are
//! stripped from returned documents.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use taskdeck_application::{
    Collection, Document, DocumentFields, DocumentId, DocumentPermission, DocumentStore,
};
use taskdeck_core::{AppError, AppResult};
use url::Url;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const API_KEY_HEADER: &str = "X-Appwrite-Key";
const GENERATED_ID: &str = "unique()";

/// Collection ids configured in the Appwrite console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppwriteCollections {
    /// Collection holding user profiles.
    pub profiles: String,
    /// Collection holding presence documents.
    pub presence: String,
    /// Collection holding notifications.
    pub notifications: String,
}

impl AppwriteCollections {
    fn id_for(&self, collection: Collection) -> &str {
        match collection {
            Collection::Profiles => self.profiles.as_str(),
            Collection::Presence => self.presence.as_str(),
            Collection::Notifications => self.notifications.as_str(),
        }
    }
}

impl Default for AppwriteCollections {
    fn default() -> Self {
        Self {
            profiles: Collection::Profiles.as_str().to_owned(),
            presence: Collection::Presence.as_str().to_owned(),
            notifications: Collection::Notifications.as_str().to_owned(),
        }
    }
}

/// Connection settings for an Appwrite project.
#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    /// API endpoint including the version segment, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: Url,
    /// Project id.
    pub project_id: String,
    /// Server API key with documents read/write scopes.
    pub api_key: String,
    /// Database id.
    pub database_id: String,
    /// Collection ids.
    pub collections: AppwriteCollections,
}

/// Appwrite implementation of the document store port.
#[derive(Clone)]
pub struct AppwriteDocumentStore {
    http_client: reqwest::Client,
    config: AppwriteConfig,
}

impl AppwriteDocumentStore {
    /// Creates a store using the given HTTP client and project settings.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: AppwriteConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn documents_url(&self, collection: Collection, document_id: Option<&str>) -> AppResult<Url> {
        let mut url = self.config.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AppError::Internal(format!(
                    "appwrite endpoint '{}' cannot be used as a base url",
                    self.config.endpoint
                ))
            })?;
            segments.pop_if_empty().extend([
                "databases",
                self.config.database_id.as_str(),
                "collections",
                self.config.collections.id_for(collection),
                "documents",
            ]);
            if let Some(document_id) = document_id {
                segments.push(document_id);
            }
        }

        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header(PROJECT_HEADER, self.config.project_id.as_str())
            .header(API_KEY_HEADER, self.config.api_key.as_str())
    }
}

#[async_trait]
impl DocumentStore for AppwriteDocumentStore {
    async fn get_document(
        &self,
        collection: Collection,
        document_id: &str,
    ) -> AppResult<Option<Document>> {
        let url = self.documents_url(collection, Some(document_id))?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error("load", collection, document_id, error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        parse_document_response(response, collection, document_id)
            .await
            .map(Some)
    }

    async fn create_document(
        &self,
        collection: Collection,
        document_id: DocumentId,
        fields: DocumentFields,
        permissions: &[DocumentPermission],
    ) -> AppResult<Document> {
        let requested_id = match &document_id {
            DocumentId::Custom(id) => id.as_str(),
            DocumentId::Generated => GENERATED_ID,
        };
        let permissions: Vec<&str> = permissions.iter().map(DocumentPermission::as_str).collect();

        let url = self.documents_url(collection, None)?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({
                "documentId": requested_id,
                "data": fields,
                "permissions": permissions,
            }))
            .send()
            .await
            .map_err(|error| transport_error("create", collection, requested_id, error))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(AppError::Conflict(format!(
                "document '{requested_id}' already exists in collection '{collection}'"
            )));
        }

        parse_document_response(response, collection, requested_id).await
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        fields: DocumentFields,
    ) -> AppResult<Document> {
        let url = self.documents_url(collection, Some(document_id))?;
        let response = self
            .request(reqwest::Method::PATCH, url)
            .json(&json!({ "data": fields }))
            .send()
            .await
            .map_err(|error| transport_error("update", collection, document_id, error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "document '{document_id}' does not exist in collection '{collection}'"
            )));
        }

        parse_document_response(response, collection, document_id).await
    }
}

async fn parse_document_response(
    response: reqwest::Response,
    collection: Collection,
    document_id: &str,
) -> AppResult<Document> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<response body unavailable>".to_owned());
        return Err(AppError::Internal(format!(
            "appwrite returned {status} for document '{document_id}' in '{collection}': {body}"
        )));
    }

    let payload = response.json::<Value>().await.map_err(|error| {
        AppError::Internal(format!(
            "appwrite returned an unreadable document '{document_id}' in '{collection}': {error}"
        ))
    })?;

    document_from_payload(payload, collection, document_id)
}

fn document_from_payload(
    payload: Value,
    collection: Collection,
    fallback_id: &str,
) -> AppResult<Document> {
    let Value::Object(mut attributes) = payload else {
        return Err(AppError::Internal(format!(
            "appwrite document '{fallback_id}' in '{collection}' is not a JSON object"
        )));
    };

    let id = attributes
        .get("$id")
        .and_then(Value::as_str)
        .unwrap_or(fallback_id)
        .to_owned();
    attributes.retain(|name, _| !name.starts_with('$'));

    Ok(Document {
        id,
        fields: attributes,
    })
}

fn transport_error(
    operation: &str,
    collection: Collection,
    document_id: &str,
    error: reqwest::Error,
) -> AppError {
    AppError::Internal(format!(
        "failed to {operation} appwrite document '{document_id}' in '{collection}': {error}"
    ))
}
