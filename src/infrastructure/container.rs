use std::sync::Arc;

use crate::{
    application::services::DocumentStore,
    domain::repositories::DocumentRepository,
    infrastructure::{
        config::AppConfig,
        database::{
            DbPool, create_connection_pool, get_connection_from_pool,
            repositories::PostgresDocumentRepository, run_migrations,
        },
        memory::InMemoryDocumentRepository,
    },
};

/// Process-wide wiring. The pool lives as long as the container; dropping it
/// closes every connection.
pub struct AppContainer {
    pub db_pool: Option<DbPool>,
    pub document_repository: Arc<dyn DocumentRepository>,
    pub document_store: DocumentStore,
}

impl AppContainer {
    /// Connects to Postgres, applies pending migrations and wires the store.
    pub fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let db_pool = create_connection_pool(&config.database)?;

        {
            let mut conn = get_connection_from_pool(&db_pool)?;
            let applied = run_migrations(&mut conn)?;
            tracing::info!(applied, "Database schema is up to date");
        }

        let document_repository: Arc<dyn DocumentRepository> =
            Arc::new(PostgresDocumentRepository::new(db_pool.clone()));
        let document_store =
            DocumentStore::new(document_repository.clone()).with_page_size(config.page_size);

        Ok(Self {
            db_pool: Some(db_pool),
            document_repository,
            document_store,
        })
    }

    /// Non-durable wiring for tests and local runs without a database.
    pub fn in_memory() -> Self {
        let document_repository: Arc<dyn DocumentRepository> =
            Arc::new(InMemoryDocumentRepository::new());
        let document_store = DocumentStore::new(document_repository.clone());

        Self {
            db_pool: None,
            document_repository,
            document_store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::CreateDocumentRequest;

    #[tokio::test]
    async fn test_in_memory_container_shares_one_repository() {
        let container = AppContainer::in_memory();
        assert!(container.db_pool.is_none());

        let created = container
            .document_store
            .create(CreateDocumentRequest::new("scan001.png", "text"))
            .await
            .unwrap();

        let found = container
            .document_repository
            .find_by_id(created.id())
            .await
            .unwrap();
        assert_eq!(found, Some(created));
    }
}
