use thiserror::Error;

use crate::domain::repositories::DocumentRepositoryError;
use crate::domain::value_objects::{DocumentId, FieldsError};

/// Errors surfaced to callers of [`DocumentStore`](super::DocumentStore).
///
/// Only `TransientStorage` is worth retrying; every other variant needs the
/// caller to change its input or its expectations.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Malformed fields: {0}")]
    MalformedFields(String),
    #[error("Document not found: {0}")]
    NotFound(DocumentId),
    #[error("Storage temporarily unavailable: {0}")]
    TransientStorage(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DocumentStoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DocumentStoreError::TransientStorage(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            DocumentStoreError::Validation(_) => "VALIDATION_ERROR",
            DocumentStoreError::MalformedFields(_) => "MALFORMED_FIELDS",
            DocumentStoreError::NotFound(_) => "NOT_FOUND",
            DocumentStoreError::TransientStorage(_) => "TRANSIENT_STORAGE_ERROR",
            DocumentStoreError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            DocumentStoreError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<DocumentRepositoryError> for DocumentStoreError {
    fn from(error: DocumentRepositoryError) -> Self {
        match error {
            DocumentRepositoryError::NotFound(id) => DocumentStoreError::NotFound(id),
            DocumentRepositoryError::ConstraintViolation(msg) => {
                DocumentStoreError::ConstraintViolation(msg)
            }
            DocumentRepositoryError::Unavailable(msg) => DocumentStoreError::TransientStorage(msg),
            DocumentRepositoryError::InvalidRecord(msg) | DocumentRepositoryError::DatabaseError(msg) => {
                DocumentStoreError::Storage(msg)
            }
        }
    }
}

impl From<FieldsError> for DocumentStoreError {
    fn from(error: FieldsError) -> Self {
        DocumentStoreError::MalformedFields(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(DocumentStoreError::TransientStorage("timeout".to_string()).is_retryable());
        assert!(!DocumentStoreError::Validation("filename".to_string()).is_retryable());
        assert!(!DocumentStoreError::NotFound(DocumentId::new(1)).is_retryable());
        assert!(!DocumentStoreError::ConstraintViolation("dup".to_string()).is_retryable());
    }

    #[test]
    fn test_repository_errors_map_onto_taxonomy() {
        let id = DocumentId::new(3);
        assert!(matches!(
            DocumentStoreError::from(DocumentRepositoryError::NotFound(id)),
            DocumentStoreError::NotFound(found) if found == id
        ));
        assert!(matches!(
            DocumentStoreError::from(DocumentRepositoryError::Unavailable("pool".to_string())),
            DocumentStoreError::TransientStorage(_)
        ));
        assert!(matches!(
            DocumentStoreError::from(DocumentRepositoryError::InvalidRecord("bad".to_string())),
            DocumentStoreError::Storage(_)
        ));
        assert_eq!(
            DocumentStoreError::from(FieldsError::NotAnObject("array")).code(),
            "MALFORMED_FIELDS"
        );
    }
}
