use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::application::services::store_error::DocumentStoreError;
use crate::domain::entities::{NewOcrDocument, OcrDocument};
use crate::domain::repositories::DocumentRepository;
use crate::domain::value_objects::{
    DocumentId, DocumentQuery, ExtractedFields, FilenameFilter, SortOrder,
};

pub const MAX_LIST_LIMIT: i64 = 1000;
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Input for [`DocumentStore::create`].
///
/// `filename` and `raw_text` are optional here so payloads that omit them, or
/// send `null`, reach the store and get a proper validation error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateDocumentRequest {
    pub filename: Option<String>,
    pub raw_text: Option<String>,
    #[serde(default)]
    pub fields: Option<Value>,
}

impl CreateDocumentRequest {
    pub fn new(filename: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            raw_text: Some(raw_text.into()),
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Owns validation and the caller-facing error taxonomy on top of a
/// [`DocumentRepository`] backend.
#[derive(Clone)]
pub struct DocumentStore {
    repository: Arc<dyn DocumentRepository>,
    page_size: i64,
}

impl DocumentStore {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repository,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.clamp(1, MAX_LIST_LIMIT);
        self
    }

    pub async fn create(&self, request: CreateDocumentRequest) -> Result<OcrDocument, DocumentStoreError> {
        let new_document = match validate_create(request) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected OCR document");
                return Err(e);
            }
        };

        let document = self.repository.insert(new_document).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to store OCR document");
            DocumentStoreError::from(e)
        })?;

        tracing::info!(
            document_id = %document.id(),
            filename = document.filename(),
            has_fields = document.has_fields(),
            "Stored OCR document"
        );

        Ok(document)
    }

    pub async fn get(&self, id: DocumentId) -> Result<OcrDocument, DocumentStoreError> {
        tracing::debug!(document_id = %id, "Fetching OCR document");

        self.repository
            .find_by_id(id)
            .await?
            .ok_or(DocumentStoreError::NotFound(id))
    }

    /// Replaces the document's fields. `None` or JSON `null` clears them.
    pub async fn update_fields(
        &self,
        id: DocumentId,
        fields: Option<Value>,
    ) -> Result<OcrDocument, DocumentStoreError> {
        let fields = ExtractedFields::from_optional(fields).map_err(|e| {
            tracing::warn!(document_id = %id, error = %e, "Rejected fields update");
            DocumentStoreError::from(e)
        })?;

        let document = self.repository.update_fields(id, fields).await?;

        tracing::info!(
            document_id = %id,
            field_count = document.fields().map_or(0, |f| f.len()),
            "Replaced OCR document fields"
        );

        Ok(document)
    }

    /// Merges the top-level keys of `patch` into the stored fields, keeping
    /// keys the patch does not mention.
    pub async fn merge_fields(&self, id: DocumentId, patch: Value) -> Result<OcrDocument, DocumentStoreError> {
        let patch = ExtractedFields::try_from(patch).map_err(|e| {
            tracing::warn!(document_id = %id, error = %e, "Rejected fields merge");
            DocumentStoreError::from(e)
        })?;
        let merged_keys = patch.len();

        let document = self.repository.merge_fields(id, patch).await?;

        tracing::info!(document_id = %id, merged_keys, "Merged OCR document fields");

        Ok(document)
    }

    pub async fn list(&self, query: DocumentQuery) -> Result<Vec<OcrDocument>, DocumentStoreError> {
        validate_query(&query, Some(MAX_LIST_LIMIT))?;

        let documents = self.repository.find_all(&query).await?;
        tracing::debug!(count = documents.len(), "Listed OCR documents");

        Ok(documents)
    }

    /// Lazily pages through the documents selected by `query`.
    ///
    /// Nothing is fetched until the stream is polled, and each call starts
    /// over from the beginning of the selection.
    pub fn stream(&self, query: DocumentQuery) -> BoxStream<'static, Result<OcrDocument, DocumentStoreError>> {
        if let Err(e) = validate_query(&query, None) {
            return stream::once(async move { Err(e) }).boxed();
        }

        let pager = Pager {
            repository: self.repository.clone(),
            remaining: query.limit,
            query,
            page_size: self.page_size,
            exhausted: false,
        };

        stream::try_unfold(pager, next_page)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, DocumentStoreError>)))
            .try_flatten()
            .boxed()
    }

    pub async fn count(&self, filter: Option<FilenameFilter>) -> Result<i64, DocumentStoreError> {
        Ok(self.repository.count(filter.as_ref()).await?)
    }

    /// The most recently created document, if any.
    pub async fn latest(&self) -> Result<Option<OcrDocument>, DocumentStoreError> {
        let query = DocumentQuery::new().order(SortOrder::Descending).limit(1);
        let mut documents = self.repository.find_all(&query).await?;

        Ok(documents.pop())
    }

    pub async fn delete(&self, id: DocumentId) -> Result<(), DocumentStoreError> {
        if !self.repository.delete(id).await? {
            return Err(DocumentStoreError::NotFound(id));
        }

        tracing::info!(document_id = %id, "Deleted OCR document");
        Ok(())
    }
}

fn validate_create(request: CreateDocumentRequest) -> Result<NewOcrDocument, DocumentStoreError> {
    let filename = request
        .filename
        .ok_or_else(|| DocumentStoreError::Validation("filename is required".to_string()))?;
    let raw_text = request
        .raw_text
        .ok_or_else(|| DocumentStoreError::Validation("raw_text is required".to_string()))?;
    let fields = ExtractedFields::from_optional(request.fields)?;

    NewOcrDocument::new(filename, raw_text, fields).map_err(DocumentStoreError::Validation)
}

/// `max_limit` bounds the total rows a single call may return. Streams pass
/// `None` since they page through the selection anyway.
fn validate_query(query: &DocumentQuery, max_limit: Option<i64>) -> Result<(), DocumentStoreError> {
    if query.offset < 0 {
        return Err(DocumentStoreError::Validation(
            "offset cannot be negative".to_string(),
        ));
    }

    match (query.limit, max_limit) {
        (Some(limit), _) if limit <= 0 => Err(DocumentStoreError::Validation(
            "limit must be positive".to_string(),
        )),
        (Some(limit), Some(max)) if limit > max => Err(DocumentStoreError::Validation(format!(
            "limit must be between 1 and {}",
            max
        ))),
        _ => Ok(()),
    }
}

struct Pager {
    repository: Arc<dyn DocumentRepository>,
    query: DocumentQuery,
    remaining: Option<i64>,
    page_size: i64,
    exhausted: bool,
}

/// Fetches one page and advances the keyset cursor past it. The caller's
/// offset only applies to the first page.
async fn next_page(mut pager: Pager) -> Result<Option<(Vec<OcrDocument>, Pager)>, DocumentStoreError> {
    if pager.exhausted || pager.remaining == Some(0) {
        return Ok(None);
    }

    let page_limit = pager
        .remaining
        .map_or(pager.page_size, |remaining| remaining.min(pager.page_size));
    let page_query = DocumentQuery {
        limit: Some(page_limit),
        ..pager.query.clone()
    };

    let page = pager.repository.find_all(&page_query).await?;
    let Some(last) = page.last() else {
        return Ok(None);
    };

    pager.query.cursor = Some(last.id());
    pager.query.offset = 0;
    pager.exhausted = (page.len() as i64) < page_limit;
    if let Some(remaining) = pager.remaining.as_mut() {
        *remaining -= page.len() as i64;
    }

    Ok(Some((page, pager)))
}
