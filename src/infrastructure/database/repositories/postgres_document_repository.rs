use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Jsonb};

use crate::domain::entities::{NewOcrDocument, OcrDocument};
use crate::domain::repositories::{DocumentRepository, DocumentRepositoryError};
use crate::domain::value_objects::{
    DocumentId, DocumentQuery, ExtractedFields, FilenameFilter, SortOrder,
};
use crate::infrastructure::database::DbPool;
use crate::infrastructure::database::models::{NewOcrDocumentModel, OcrDocumentModel};
use crate::infrastructure::database::schema::ocr_documents;

/// A stored value that is not an object (or is SQL NULL) is treated as empty
/// before the `||` merge, so the result is always an object.
const MERGE_FIELDS_SQL: &str = r#"
UPDATE ocr_documents
   SET fields = CASE WHEN jsonb_typeof(fields) = 'object' THEN fields ELSE '{}'::jsonb END || $1
 WHERE id = $2
RETURNING id, filename, raw_text, fields, created_at
"#;

pub struct PostgresDocumentRepository {
    pool: DbPool,
}

impl PostgresDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Checks out a connection and runs `operation` on the blocking pool.
    async fn run<T, F>(&self, operation: F) -> Result<T, DocumentRepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, DocumentRepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                DocumentRepositoryError::Unavailable(format!(
                    "Failed to get database connection: {}",
                    e
                ))
            })?;
            operation(&mut conn)
        })
        .await
        .map_err(|e| DocumentRepositoryError::DatabaseError(format!("Task join error: {}", e)))?
    }
}

fn classify(context: &str, error: DieselError) -> DocumentRepositoryError {
    match error {
        DieselError::DatabaseError(kind, info) => {
            let message = format!("{}: {}", context, info.message());
            match kind {
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::ForeignKeyViolation => {
                    DocumentRepositoryError::ConstraintViolation(message)
                }
                DatabaseErrorKind::ClosedConnection
                | DatabaseErrorKind::SerializationFailure
                | DatabaseErrorKind::UnableToSendCommand => {
                    DocumentRepositoryError::Unavailable(message)
                }
                _ => DocumentRepositoryError::DatabaseError(message),
            }
        }
        DieselError::BrokenTransactionManager => {
            DocumentRepositoryError::Unavailable(format!("{}: broken transaction manager", context))
        }
        other => DocumentRepositoryError::DatabaseError(format!("{}: {}", context, other)),
    }
}

fn to_domain(model: OcrDocumentModel) -> Result<OcrDocument, DocumentRepositoryError> {
    OcrDocument::try_from(model).map_err(DocumentRepositoryError::InvalidRecord)
}

fn filtered(filter: Option<&FilenameFilter>) -> ocr_documents::BoxedQuery<'static, Pg> {
    let query = ocr_documents::table.into_boxed();
    match filter {
        None => query,
        Some(FilenameFilter::Exact(name)) => query.filter(ocr_documents::filename.eq(name.clone())),
        Some(FilenameFilter::Prefix(prefix)) => {
            query.filter(ocr_documents::filename.like(FilenameFilter::like_pattern(prefix)))
        }
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    async fn insert(&self, document: NewOcrDocument) -> Result<OcrDocument, DocumentRepositoryError> {
        let new_document = NewOcrDocumentModel::from(&document);

        let model = self
            .run(move |conn| {
                diesel::insert_into(ocr_documents::table)
                    .values(&new_document)
                    .returning(OcrDocumentModel::as_returning())
                    .get_result::<OcrDocumentModel>(conn)
                    .map_err(|e| classify("Failed to insert document", e))
            })
            .await?;

        to_domain(model)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<OcrDocument>, DocumentRepositoryError> {
        let result = self
            .run(move |conn| {
                ocr_documents::table
                    .find(id.value())
                    .select(OcrDocumentModel::as_select())
                    .first::<OcrDocumentModel>(conn)
                    .optional()
                    .map_err(|e| classify("Failed to find document", e))
            })
            .await?;

        result.map(to_domain).transpose()
    }

    async fn update_fields(
        &self,
        id: DocumentId,
        fields: Option<ExtractedFields>,
    ) -> Result<OcrDocument, DocumentRepositoryError> {
        let value = fields.map(ExtractedFields::into_value);

        let result = self
            .run(move |conn| {
                diesel::update(ocr_documents::table.find(id.value()))
                    .set(ocr_documents::fields.eq(value))
                    .returning(OcrDocumentModel::as_returning())
                    .get_result::<OcrDocumentModel>(conn)
                    .optional()
                    .map_err(|e| classify("Failed to update document fields", e))
            })
            .await?;

        match result {
            Some(model) => to_domain(model),
            None => Err(DocumentRepositoryError::NotFound(id)),
        }
    }

    async fn merge_fields(
        &self,
        id: DocumentId,
        patch: ExtractedFields,
    ) -> Result<OcrDocument, DocumentRepositoryError> {
        let patch = patch.into_value();

        let result = self
            .run(move |conn| {
                diesel::sql_query(MERGE_FIELDS_SQL)
                    .bind::<Jsonb, _>(patch)
                    .bind::<BigInt, _>(id.value())
                    .get_result::<OcrDocumentModel>(conn)
                    .optional()
                    .map_err(|e| classify("Failed to merge document fields", e))
            })
            .await?;

        match result {
            Some(model) => to_domain(model),
            None => Err(DocumentRepositoryError::NotFound(id)),
        }
    }

    async fn find_all(&self, query: &DocumentQuery) -> Result<Vec<OcrDocument>, DocumentRepositoryError> {
        let query = query.clone();

        let models = self
            .run(move |conn| {
                let mut statement = filtered(query.filename.as_ref());

                if let Some(cursor) = query.cursor {
                    statement = match query.order {
                        SortOrder::Ascending => statement.filter(ocr_documents::id.gt(cursor.value())),
                        SortOrder::Descending => statement.filter(ocr_documents::id.lt(cursor.value())),
                    };
                }

                statement = match query.order {
                    SortOrder::Ascending => statement.order(ocr_documents::id.asc()),
                    SortOrder::Descending => statement.order(ocr_documents::id.desc()),
                };

                if query.offset > 0 {
                    statement = statement.offset(query.offset);
                }
                if let Some(limit) = query.limit {
                    statement = statement.limit(limit);
                }

                statement
                    .select(OcrDocumentModel::as_select())
                    .load::<OcrDocumentModel>(conn)
                    .map_err(|e| classify("Failed to list documents", e))
            })
            .await?;

        models.into_iter().map(to_domain).collect()
    }

    async fn count(&self, filter: Option<&FilenameFilter>) -> Result<i64, DocumentRepositoryError> {
        let filter = filter.cloned();

        self.run(move |conn| {
            filtered(filter.as_ref())
                .count()
                .get_result::<i64>(conn)
                .map_err(|e| classify("Failed to count documents", e))
        })
        .await
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, DocumentRepositoryError> {
        let deleted_count = self
            .run(move |conn| {
                diesel::delete(ocr_documents::table.find(id.value()))
                    .execute(conn)
                    .map_err(|e| classify("Failed to delete document", e))
            })
            .await?;

        Ok(deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::AppConfig;
    use crate::infrastructure::database::{create_connection_pool, get_connection_from_pool, run_migrations};
    use serde_json::json;

    #[test]
    fn test_constraint_errors_are_classified() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::NotNullViolation,
            Box::new("null value in column \"raw_text\"".to_string()),
        );

        match classify("Failed to insert document", error) {
            DocumentRepositoryError::ConstraintViolation(message) => {
                assert!(message.starts_with("Failed to insert document"));
                assert!(message.contains("raw_text"));
            }
            other => panic!("Expected constraint violation, got {:?}", other),
        }
    }

    #[test]
    fn test_connection_errors_are_transient() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_string()),
        );
        assert!(matches!(
            classify("Failed to find document", error),
            DocumentRepositoryError::Unavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_stay_database_errors() {
        assert!(matches!(
            classify("Failed to list documents", DieselError::NotFound),
            DocumentRepositoryError::DatabaseError(_)
        ));
    }

    /// Runs against a real Postgres when `TEST_DATABASE_URL` is set.
    #[tokio::test]
    async fn test_postgres_round_trip() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };

        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.clone()),
            "DB_POOL_MAX_SIZE" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();

        let pool = create_connection_pool(&config.database).unwrap();
        {
            let mut conn = get_connection_from_pool(&pool).unwrap();
            run_migrations(&mut conn).unwrap();
        }
        let repository = PostgresDocumentRepository::new(pool);

        let prefix = format!("pg-test-{}-", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let first = repository
            .insert(
                NewOcrDocument::new(
                    format!("{}scan001.png", prefix),
                    "Invoice #A-100\nTotal: 42.50".to_string(),
                    None,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let second = repository
            .insert(NewOcrDocument::new(format!("{}scan002.png", prefix), String::new(), None).unwrap())
            .await
            .unwrap();
        assert!(second.id() > first.id());
        assert!(first.fields().is_none());

        let fields = ExtractedFields::try_from(json!({"invoice_no": "A-100", "total": 42.5})).unwrap();
        let updated = repository.update_fields(first.id(), Some(fields.clone())).await.unwrap();
        assert_eq!(updated.fields(), Some(&fields));
        assert_eq!(updated.created_at(), first.created_at());

        let patch = ExtractedFields::try_from(json!({"balance_sheet": {"rows": []}})).unwrap();
        let merged = repository.merge_fields(first.id(), patch).await.unwrap();
        assert_eq!(merged.fields().unwrap().len(), 3);

        let listed = repository
            .find_all(&DocumentQuery::new().filename_starts_with(prefix.clone()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id(), first.id());

        let filter = FilenameFilter::Prefix(prefix);
        assert_eq!(repository.count(Some(&filter)).await.unwrap(), 2);

        assert!(repository.delete(first.id()).await.unwrap());
        assert!(repository.delete(second.id()).await.unwrap());
        assert!(!repository.delete(second.id()).await.unwrap());
        assert!(repository.find_by_id(first.id()).await.unwrap().is_none());
        assert!(matches!(
            repository.update_fields(first.id(), None).await,
            Err(DocumentRepositoryError::NotFound(_))
        ));
    }
}
