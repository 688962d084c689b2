use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::connection::DbPool;
use crate::paths::{CollectionPath, DocPath};
use crate::store::{Document, DocumentStore, DocumentWrite, StoreError, WritePrecondition};

/// Sqlite-backed document store: one row per document, JSON body as text,
/// revision counter maintained on every write. Batches run inside a single
/// transaction so catalog approvals and edit resolutions commit
/// all-or-nothing.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: DbPool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                body TEXT NOT NULL,
                revision INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection
             ON documents (collection, doc_id)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn apply_write(
    conn: &mut SqliteConnection,
    path: &DocPath,
    body: &Value,
    precondition: WritePrecondition,
) -> Result<u64, StoreError> {
    let rendered = path.render();
    let current: Option<i64> =
        sqlx::query("SELECT revision FROM documents WHERE path = ?")
            .bind(&rendered)
            .fetch_optional(&mut *conn)
            .await?
            .map(|row| row.get::<i64, _>("revision"));

    match (precondition, current) {
        (WritePrecondition::None, _) => {}
        (WritePrecondition::MustNotExist, None) => {}
        (WritePrecondition::MustNotExist, Some(_)) => {
            return Err(StoreError::AlreadyExists(rendered));
        }
        (WritePrecondition::MustMatchRevision(expected), Some(actual))
            if actual as u64 == expected => {}
        (WritePrecondition::MustMatchRevision(expected), Some(actual)) => {
            return Err(StoreError::RevisionConflict {
                path: rendered,
                expected,
                actual: actual as u64,
            });
        }
        (WritePrecondition::MustMatchRevision(expected), None) => {
            return Err(StoreError::RevisionConflict { path: rendered, expected, actual: 0 });
        }
    }

    let encoded = serde_json::to_string(body)
        .map_err(|error| StoreError::Decode { path: rendered.clone(), message: error.to_string() })?;
    let next_revision = current.map(|revision| revision + 1).unwrap_or(1);

    sqlx::query(
        "INSERT INTO documents (path, collection, doc_id, body, revision)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(path) DO UPDATE SET body = excluded.body, revision = excluded.revision",
    )
    .bind(&rendered)
    .bind(path.collection().as_str())
    .bind(path.doc_id())
    .bind(&encoded)
    .bind(next_revision)
    .execute(&mut *conn)
    .await?;

    Ok(next_revision as u64)
}

fn decode_row(path: String, doc_id: String, body: String, revision: i64) -> Result<Document, StoreError> {
    let body = serde_json::from_str(&body)
        .map_err(|error| StoreError::Decode { path: path.clone(), message: error.to_string() })?;
    Ok(Document { path, doc_id, body, revision: revision as u64 })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let rendered = path.render();
        let row = sqlx::query("SELECT doc_id, body, revision FROM documents WHERE path = ?")
            .bind(&rendered)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            decode_row(
                rendered.clone(),
                row.get::<String, _>("doc_id"),
                row.get::<String, _>("body"),
                row.get::<i64, _>("revision"),
            )
        })
        .transpose()
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT path, doc_id, body, revision FROM documents
             WHERE collection = ? ORDER BY doc_id",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                decode_row(
                    row.get::<String, _>("path"),
                    row.get::<String, _>("doc_id"),
                    row.get::<String, _>("body"),
                    row.get::<i64, _>("revision"),
                )
            })
            .collect()
    }

    async fn put(
        &self,
        path: &DocPath,
        body: Value,
        precondition: WritePrecondition,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let revision = apply_write(&mut tx, path, &body, precondition).await?;
        tx.commit().await?;
        Ok(revision)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE path = ?")
            .bind(path.render())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for write in &writes {
            // An error here drops the transaction, rolling back the batch.
            apply_write(&mut tx, &write.path, &write.body, write.precondition).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dealdesk_core::domain::tenant::TenantId;
    use serde_json::json;

    use super::SqliteDocumentStore;
    use crate::connection::connect_with_settings;
    use crate::paths::{CollectionPath, PRODUCTS};
    use crate::store::{DocumentStore, DocumentWrite, StoreError, WritePrecondition};

    async fn store() -> SqliteDocumentStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        let store = SqliteDocumentStore::new(pool);
        store.ensure_schema().await.expect("schema");
        store
    }

    fn products() -> CollectionPath {
        CollectionPath::tenant_scoped(&TenantId("t-1".to_string()), PRODUCTS)
    }

    #[tokio::test]
    async fn round_trips_documents_with_revisions() {
        let store = store().await;
        let path = products().doc("p-1");

        let first = store
            .put(&path, json!({"name": "Platform"}), WritePrecondition::None)
            .await
            .expect("put");
        assert_eq!(first, 1);

        let doc = store.get(&path).await.expect("get").expect("present");
        assert_eq!(doc.body["name"], "Platform");
        assert_eq!(doc.revision, 1);

        let second = store
            .put(&path, json!({"name": "Platform v2"}), WritePrecondition::MustMatchRevision(1))
            .await
            .expect("guarded update");
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn batch_write_rolls_back_on_conflict() {
        let store = store().await;
        let existing = products().doc("p-1");
        store.put(&existing, json!({"name": "seed"}), WritePrecondition::None).await.expect("seed");

        let result = store
            .batch_write(vec![
                DocumentWrite {
                    path: products().doc("p-2"),
                    body: json!({"name": "new"}),
                    precondition: WritePrecondition::MustNotExist,
                },
                DocumentWrite {
                    path: existing,
                    body: json!({"name": "clobber"}),
                    precondition: WritePrecondition::MustNotExist,
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
        assert!(store.get(&products().doc("p-2")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = store().await;
        let path = products().doc("p-1");
        store.put(&path, json!({"v": 1}), WritePrecondition::None).await.expect("seed");
        store.put(&path, json!({"v": 2}), WritePrecondition::None).await.expect("advance");

        let error = store
            .put(&path, json!({"v": 3}), WritePrecondition::MustMatchRevision(1))
            .await
            .expect_err("stale");
        assert!(matches!(error, StoreError::RevisionConflict { expected: 1, actual: 2, .. }));
    }
}
