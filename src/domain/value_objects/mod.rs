pub mod document_id;
pub mod document_query;
pub mod extracted_fields;

pub use document_id::DocumentId;
pub use document_query::{DocumentQuery, FilenameFilter, SortOrder};
pub use extracted_fields::{ExtractedFields, FieldsError};
