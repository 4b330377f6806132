//! Durable storage for OCR results: the recognized text of each ingested file
//! plus the structured fields an extraction step derives from it.
//!
//! [`DocumentStore`] is the entry point. It validates inputs and maps backend
//! failures onto [`DocumentStoreError`]; the Postgres backend lives under
//! [`infrastructure::database`], an in-memory one under [`infrastructure::memory`].

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::services::{CreateDocumentRequest, DocumentStore, DocumentStoreError};
pub use domain::entities::OcrDocument;
pub use domain::value_objects::{DocumentId, DocumentQuery, ExtractedFields, FilenameFilter, SortOrder};
pub use infrastructure::{AppConfig, AppContainer};
