//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod appwrite_document_store;
mod in_memory_document_store;
mod postgres_document_store;
mod redis_document_store;

pub use appwrite_document_store::{AppwriteCollections, AppwriteConfig, AppwriteDocumentStore};
pub use in_memory_document_store::InMemoryDocumentStore;
pub use postgres_document_store::PostgresDocumentStore;
pub use redis_document_store::RedisDocumentStore;

/// Schema migrations for [`PostgresDocumentStore`].
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
