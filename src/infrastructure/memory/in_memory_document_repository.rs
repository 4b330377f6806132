use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::domain::entities::{NewOcrDocument, OcrDocument};
use crate::domain::repositories::{DocumentRepository, DocumentRepositoryError};
use crate::domain::value_objects::{
    DocumentId, DocumentQuery, ExtractedFields, FilenameFilter, SortOrder,
};

/// Non-durable backend with the same observable behavior as the Postgres one:
/// ids come from a sequence starting at 1 and timestamps carry microsecond
/// precision like `TIMESTAMPTZ`.
pub struct InMemoryDocumentRepository {
    state: Mutex<MemoryState>,
}

struct MemoryState {
    documents: BTreeMap<DocumentId, OcrDocument>,
    last_id: i64,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                documents: BTreeMap::new(),
                last_id: 0,
            }),
        }
    }
}

impl Default for InMemoryDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(filter: Option<&FilenameFilter>, document: &OcrDocument) -> bool {
    filter.is_none_or(|f| f.matches(document.filename()))
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, document: NewOcrDocument) -> Result<OcrDocument, DocumentRepositoryError> {
        let mut state = self.state.lock().await;

        // Like a sequence, an id is never handed out twice even after deletes.
        state.last_id += 1;
        let id = DocumentId::new(state.last_id);
        let stored = document.into_document(id, Utc::now().trunc_subsecs(6));
        state.documents.insert(id, stored.clone());

        Ok(stored)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<OcrDocument>, DocumentRepositoryError> {
        let state = self.state.lock().await;
        Ok(state.documents.get(&id).cloned())
    }

    async fn update_fields(
        &self,
        id: DocumentId,
        fields: Option<ExtractedFields>,
    ) -> Result<OcrDocument, DocumentRepositoryError> {
        let mut state = self.state.lock().await;
        let document = state
            .documents
            .get_mut(&id)
            .ok_or(DocumentRepositoryError::NotFound(id))?;

        document.replace_fields(fields);
        Ok(document.clone())
    }

    async fn merge_fields(
        &self,
        id: DocumentId,
        patch: ExtractedFields,
    ) -> Result<OcrDocument, DocumentRepositoryError> {
        let mut state = self.state.lock().await;
        let document = state
            .documents
            .get_mut(&id)
            .ok_or(DocumentRepositoryError::NotFound(id))?;

        document.merge_fields(patch);
        Ok(document.clone())
    }

    async fn find_all(&self, query: &DocumentQuery) -> Result<Vec<OcrDocument>, DocumentRepositoryError> {
        let state = self.state.lock().await;

        let matching = state
            .documents
            .values()
            .filter(|d| matches_filter(query.filename.as_ref(), d))
            .filter(|d| query.is_past_cursor(d.id()));

        let ordered: Box<dyn Iterator<Item = &OcrDocument> + '_> = match query.order {
            SortOrder::Ascending => Box::new(matching),
            SortOrder::Descending => Box::new(matching.rev()),
        };

        let skipped = ordered.skip(usize::try_from(query.offset).unwrap_or(0));
        let documents = match query.limit {
            Some(limit) => skipped
                .take(usize::try_from(limit).unwrap_or(0))
                .cloned()
                .collect(),
            None => skipped.cloned().collect(),
        };

        Ok(documents)
    }

    async fn count(&self, filter: Option<&FilenameFilter>) -> Result<i64, DocumentRepositoryError> {
        let state = self.state.lock().await;
        let count = state
            .documents
            .values()
            .filter(|d| matches_filter(filter, d))
            .count();

        Ok(count as i64)
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, DocumentRepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.documents.remove(&id).is_some())
    }
}
