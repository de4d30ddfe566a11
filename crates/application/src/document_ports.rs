use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde_json::{Map, Value};

use taskdeck_core::AppResult;

/// Attribute map of a stored document, without system attributes.
pub type DocumentFields = Map<String, Value>;

/// Collections the backend reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// One profile per user, keyed by user id.
    Profiles,
    /// One presence/limiter record per user, keyed by user id.
    Presence,
    /// In-app notifications with generated ids.
    Notifications,
}

impl Collection {
    /// Returns the default storage name of the collection.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Presence => "presence",
            Self::Notifications => "notifications",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier requested when creating a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentId {
    /// Caller-chosen id.
    Custom(String),
    /// Let the store generate a unique id.
    Generated,
}

/// Access rule attached to a created document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPermission(String);

impl DocumentPermission {
    /// Read access for a single user, e.g. `read("user:abc")`.
    #[must_use]
    pub fn read_user(user_id: &str) -> Self {
        Self(format!("read(\"user:{user_id}\")"))
    }

    /// Returns the encoded permission string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id, unique inside its collection.
    pub id: String,
    /// User-defined attributes.
    pub fields: DocumentFields,
}

/// Port for the external document store.
///
/// Adapters report a missing document on update with `AppError::NotFound`
/// and an id collision on create with `AppError::Conflict`. Any other error
/// is an infrastructure failure.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads a document, returning `None` when it does not exist.
    async fn get_document(
        &self,
        collection: Collection,
        document_id: &str,
    ) -> AppResult<Option<Document>>;

    /// Creates a document.
    async fn create_document(
        &self,
        collection: Collection,
        document_id: DocumentId,
        fields: DocumentFields,
        permissions: &[DocumentPermission],
    ) -> AppResult<Document>;

    /// Merges `fields` into an existing document.
    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        fields: DocumentFields,
    ) -> AppResult<Document>;
}
