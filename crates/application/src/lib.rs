//! Application services and ports.

#![forbid(unsafe_code)]

mod document_ports;
mod feedback_guard_service;

pub use document_ports::{
    Collection, Document, DocumentFields, DocumentId, DocumentPermission, DocumentStore,
};
pub use feedback_guard_service::FeedbackGuardService;
