use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::paths::{CollectionPath, DocPath};
use crate::store::{Document, DocumentStore, DocumentWrite, StoreError, WritePrecondition};

#[derive(Clone, Debug)]
struct StoredDoc {
    collection: String,
    doc_id: String,
    body: Value,
    revision: u64,
}

/// Test and demo double for the sqlite store. A single mutex over the map
/// makes batches atomic by construction.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    docs: Arc<Mutex<BTreeMap<String, StoredDoc>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredDoc>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_precondition(
        existing: Option<&StoredDoc>,
        precondition: WritePrecondition,
        path: &str,
    ) -> Result<(), StoreError> {
        match (precondition, existing) {
            (WritePrecondition::None, _) => Ok(()),
            (WritePrecondition::MustNotExist, None) => Ok(()),
            (WritePrecondition::MustNotExist, Some(_)) => {
                Err(StoreError::AlreadyExists(path.to_string()))
            }
            (WritePrecondition::MustMatchRevision(expected), Some(doc))
                if doc.revision == expected =>
            {
                Ok(())
            }
            (WritePrecondition::MustMatchRevision(expected), Some(doc)) => {
                Err(StoreError::RevisionConflict {
                    path: path.to_string(),
                    expected,
                    actual: doc.revision,
                })
            }
            (WritePrecondition::MustMatchRevision(expected), None) => {
                Err(StoreError::RevisionConflict { path: path.to_string(), expected, actual: 0 })
            }
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let docs = self.lock();
        Ok(docs.get(&path.render()).map(|doc| Document {
            path: path.render(),
            doc_id: doc.doc_id.clone(),
            body: doc.body.clone(),
            revision: doc.revision,
        }))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let docs = self.lock();
        Ok(docs
            .iter()
            .filter(|(_, doc)| doc.collection == collection.as_str())
            .map(|(path, doc)| Document {
                path: path.clone(),
                doc_id: doc.doc_id.clone(),
                body: doc.body.clone(),
                revision: doc.revision,
            })
            .collect())
    }

    async fn put(
        &self,
        path: &DocPath,
        body: Value,
        precondition: WritePrecondition,
    ) -> Result<u64, StoreError> {
        let mut docs = self.lock();
        let rendered = path.render();
        Self::check_precondition(docs.get(&rendered), precondition, &rendered)?;

        let revision = docs.get(&rendered).map(|doc| doc.revision + 1).unwrap_or(1);
        docs.insert(
            rendered,
            StoredDoc {
                collection: path.collection().as_str().to_string(),
                doc_id: path.doc_id().to_string(),
                body,
                revision,
            },
        );
        Ok(revision)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut docs = self.lock();
        docs.remove(&path.render());
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        let mut docs = self.lock();

        // Validate everything before touching anything.
        for write in &writes {
            let rendered = write.path.render();
            Self::check_precondition(docs.get(&rendered), write.precondition, &rendered)?;
        }

        for write in writes {
            let rendered = write.path.render();
            let revision = docs.get(&rendered).map(|doc| doc.revision + 1).unwrap_or(1);
            docs.insert(
                rendered,
                StoredDoc {
                    collection: write.path.collection().as_str().to_string(),
                    doc_id: write.path.doc_id().to_string(),
                    body: write.body,
                    revision,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dealdesk_core::domain::tenant::TenantId;
    use serde_json::json;

    use super::InMemoryDocumentStore;
    use crate::paths::{CollectionPath, PRODUCTS};
    use crate::store::{DocumentStore, DocumentWrite, StoreError, WritePrecondition};

    fn products() -> CollectionPath {
        CollectionPath::tenant_scoped(&TenantId("t-1".to_string()), PRODUCTS)
    }

    #[tokio::test]
    async fn put_get_and_revision_bump() {
        let store = InMemoryDocumentStore::new();
        let path = products().doc("p-1");

        let first = store
            .put(&path, json!({"name": "a"}), WritePrecondition::None)
            .await
            .expect("first put");
        let second = store
            .put(&path, json!({"name": "b"}), WritePrecondition::None)
            .await
            .expect("second put");

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        let doc = store.get(&path).await.expect("get").expect("present");
        assert_eq!(doc.body["name"], "b");
        assert_eq!(doc.revision, 2);
    }

    #[tokio::test]
    async fn stale_revision_write_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let path = products().doc("p-1");
        store.put(&path, json!({"v": 1}), WritePrecondition::None).await.expect("seed");
        store.put(&path, json!({"v": 2}), WritePrecondition::None).await.expect("advance");

        let error = store
            .put(&path, json!({"v": 99}), WritePrecondition::MustMatchRevision(1))
            .await
            .expect_err("stale writer");
        assert!(matches!(
            error,
            StoreError::RevisionConflict { expected: 1, actual: 2, .. }
        ));
    }

    #[tokio::test]
    async fn failed_batch_precondition_rolls_back_everything() {
        let store = InMemoryDocumentStore::new();
        let existing = products().doc("p-existing");
        store.put(&existing, json!({"name": "seed"}), WritePrecondition::None).await.expect("seed");

        let result = store
            .batch_write(vec![
                DocumentWrite {
                    path: products().doc("p-new"),
                    body: json!({"name": "new"}),
                    precondition: WritePrecondition::MustNotExist,
                },
                DocumentWrite {
                    path: existing.clone(),
                    body: json!({"name": "clobber"}),
                    precondition: WritePrecondition::MustNotExist,
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
        assert!(store.get(&products().doc("p-new")).await.expect("get").is_none());
        let untouched = store.get(&existing).await.expect("get").expect("present");
        assert_eq!(untouched.body["name"], "seed");
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_collection_and_ordered() {
        let store = InMemoryDocumentStore::new();
        let other =
            CollectionPath::tenant_scoped(&TenantId("t-2".to_string()), PRODUCTS).doc("p-9");
        store.put(&other, json!({}), WritePrecondition::None).await.expect("other tenant");
        store.put(&products().doc("p-b"), json!({}), WritePrecondition::None).await.expect("b");
        store.put(&products().doc("p-a"), json!({}), WritePrecondition::None).await.expect("a");

        let listed = store.list(&products()).await.expect("list");
        let ids: Vec<&str> = listed.iter().map(|doc| doc.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["p-a", "p-b"]);
    }
}
