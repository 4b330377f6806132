pub mod ocr_document;

pub use ocr_document::{NewOcrDocument, OcrDocument};
