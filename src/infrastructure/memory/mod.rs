pub mod in_memory_document_repository;

pub use in_memory_document_repository::InMemoryDocumentRepository;
