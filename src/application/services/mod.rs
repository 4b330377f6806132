pub mod document_store;
pub mod store_error;

pub use document_store::{CreateDocumentRequest, DocumentStore};
pub use store_error::DocumentStoreError;
