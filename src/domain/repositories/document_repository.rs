use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{NewOcrDocument, OcrDocument};
use crate::domain::value_objects::{DocumentId, DocumentQuery, ExtractedFields, FilenameFilter};

#[derive(Debug, Error)]
pub enum DocumentRepositoryError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Durable storage of OCR documents.
///
/// Every method is a single atomic unit against the backend: a write is either
/// fully committed or not visible at all.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Stores the document, assigning a fresh id and the creation timestamp.
    async fn insert(&self, document: NewOcrDocument) -> Result<OcrDocument, DocumentRepositoryError>;

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<OcrDocument>, DocumentRepositoryError>;

    /// Replaces `fields` wholesale. Fails with `NotFound` for unknown ids.
    async fn update_fields(
        &self,
        id: DocumentId,
        fields: Option<ExtractedFields>,
    ) -> Result<OcrDocument, DocumentRepositoryError>;

    /// Shallow-merges `patch` into the stored fields. Fails with `NotFound` for unknown ids.
    async fn merge_fields(
        &self,
        id: DocumentId,
        patch: ExtractedFields,
    ) -> Result<OcrDocument, DocumentRepositoryError>;

    async fn find_all(&self, query: &DocumentQuery) -> Result<Vec<OcrDocument>, DocumentRepositoryError>;

    async fn count(&self, filter: Option<&FilenameFilter>) -> Result<i64, DocumentRepositoryError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: DocumentId) -> Result<bool, DocumentRepositoryError>;
}
