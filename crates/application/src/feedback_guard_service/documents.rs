use chrono::{DateTime, Utc};
use serde_json::Value;
use taskdeck_core::{AppError, AppResult};
use taskdeck_domain::NotificationDraft;

use crate::{Collection, Document, DocumentFields};

pub(super) fn decode_document<T>(collection: Collection, document: &Document) -> AppResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(Value::Object(document.fields.clone())).map_err(|error| {
        AppError::Internal(format!(
            "malformed {collection} document '{}': {error}",
            document.id
        ))
    })
}

pub(super) fn encode_fields<T>(value: &T) -> AppResult<DocumentFields>
where
    T: serde::Serialize,
{
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(AppError::Internal(format!(
            "expected document fields to encode as an object, got {other}"
        ))),
        Err(error) => Err(AppError::Internal(format!(
            "failed to encode document fields: {error}"
        ))),
    }
}

pub(super) fn notification_fields(
    draft: &NotificationDraft,
    created_at: DateTime<Utc>,
) -> DocumentFields {
    let mut fields = DocumentFields::new();
    fields.insert(
        "type".to_owned(),
        Value::from(draft.notification_type().as_str()),
    );
    fields.insert(
        "recipientId".to_owned(),
        Value::from(draft.recipient_id().as_str()),
    );
    fields.insert("message".to_owned(), Value::from(draft.message()));
    fields.insert("metadata".to_owned(), Value::from(draft.metadata_string()));
    fields.insert("isRead".to_owned(), Value::Bool(false));
    fields.insert("createdAt".to_owned(), Value::from(created_at.to_rfc3339()));
    fields
}
