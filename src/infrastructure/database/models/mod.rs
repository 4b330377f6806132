pub mod ocr_document_model;

pub use ocr_document_model::*;
