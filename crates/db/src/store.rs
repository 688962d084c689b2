use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::paths::{CollectionPath, DocPath};

/// A stored document plus the revision counter used for optimistic
/// concurrency. Revisions start at 1 and increase by one per write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub doc_id: String,
    pub body: Value,
    pub revision: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Unconditional upsert.
    None,
    /// The document must not exist yet; used for append-only records.
    MustNotExist,
    /// The stored revision must match; the loser of a race gets a
    /// [`StoreError::RevisionConflict`].
    MustMatchRevision(u64),
}

#[derive(Clone, Debug)]
pub struct DocumentWrite {
    pub path: DocPath,
    pub body: Value,
    pub precondition: WritePrecondition,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revision conflict at {path}: expected {expected}, found {actual}")]
    RevisionConflict { path: String, expected: u64, actual: u64 },
    #[error("document already exists at {0}")]
    AlreadyExists(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error at {path}: {message}")]
    Decode { path: String, message: String },
}

/// The storage collaborator: a tenant-scoped document store with the
/// primitives the core needs, including the atomic batch write behind
/// catalog approval and edit resolution. Implementations must apply a batch
/// all-or-nothing: one failed precondition rolls back every write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Documents of a collection in ascending id order.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Upserts one document, returning the new revision.
    async fn put(
        &self,
        path: &DocPath,
        body: Value,
        precondition: WritePrecondition,
    ) -> Result<u64, StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    async fn batch_write(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError>;
}
