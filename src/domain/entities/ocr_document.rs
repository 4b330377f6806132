use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{DocumentId, ExtractedFields};

/// One OCR'd file: its name, the recognized text and, once extraction has
/// run, the structured fields derived from that text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    id: DocumentId,
    filename: String,
    raw_text: String,
    fields: Option<ExtractedFields>,
    created_at: DateTime<Utc>,
}

impl OcrDocument {
    /// Rebuilds a document from persisted state. Only storage backends call this.
    pub fn restore(
        id: DocumentId,
        filename: String,
        raw_text: String,
        fields: Option<ExtractedFields>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            filename,
            raw_text,
            fields,
            created_at,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn fields(&self) -> Option<&ExtractedFields> {
        self.fields.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_fields(&self) -> bool {
        self.fields.is_some()
    }

    /// Full replacement; identity, text and `created_at` are left alone.
    pub fn replace_fields(&mut self, fields: Option<ExtractedFields>) {
        self.fields = fields;
    }

    pub fn merge_fields(&mut self, patch: ExtractedFields) {
        match self.fields.as_mut() {
            Some(existing) => existing.merge(patch),
            None => self.fields = Some(patch),
        }
    }
}

/// A document that passed write-time validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOcrDocument {
    filename: String,
    raw_text: String,
    fields: Option<ExtractedFields>,
}

impl NewOcrDocument {
    pub fn new(
        filename: String,
        raw_text: String,
        fields: Option<ExtractedFields>,
    ) -> Result<Self, String> {
        if filename.contains('\0') {
            return Err("filename must not contain NUL characters".to_string());
        }
        if raw_text.contains('\0') {
            return Err("raw_text must not contain NUL characters".to_string());
        }

        Ok(Self {
            filename,
            raw_text,
            fields,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn fields(&self) -> Option<&ExtractedFields> {
        self.fields.as_ref()
    }

    pub fn into_document(self, id: DocumentId, created_at: DateTime<Utc>) -> OcrDocument {
        OcrDocument::restore(id, self.filename, self.raw_text, self.fields, created_at)
    }
}
