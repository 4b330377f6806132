use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::entities::{NewOcrDocument, OcrDocument};
use crate::domain::value_objects::{DocumentId, ExtractedFields};
use crate::infrastructure::database::schema::ocr_documents;

#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = ocr_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OcrDocumentModel {
    pub id: i64,
    pub filename: String,
    pub raw_text: String,
    pub fields: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// `created_at` is left to the column default so the database clock stamps
/// every record.
#[derive(Debug, Insertable)]
#[diesel(table_name = ocr_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewOcrDocumentModel {
    pub filename: String,
    pub raw_text: String,
    pub fields: Option<serde_json::Value>,
}

impl From<&NewOcrDocument> for NewOcrDocumentModel {
    fn from(document: &NewOcrDocument) -> Self {
        Self {
            filename: document.filename().to_string(),
            raw_text: document.raw_text().to_string(),
            fields: document.fields().map(|f| f.clone().into_value()),
        }
    }
}

impl TryFrom<OcrDocumentModel> for OcrDocument {
    type Error = String;

    fn try_from(model: OcrDocumentModel) -> Result<Self, Self::Error> {
        let fields = ExtractedFields::from_optional(model.fields)
            .map_err(|e| format!("Invalid fields for document {}: {}", model.id, e))?;

        Ok(OcrDocument::restore(
            DocumentId::new(model.id),
            model.filename,
            model.raw_text,
            fields,
            model.created_at,
        ))
    }
}
