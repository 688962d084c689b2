pub mod connection;
pub mod memory;
pub mod paths;
pub mod repositories;
pub mod sqlite;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use memory::InMemoryDocumentStore;
pub use paths::{CollectionPath, DocPath};
pub use repositories::{
    CatalogRepository, ProposalRepository, RepositoryError, TenantRepository,
};
pub use sqlite::SqliteDocumentStore;
pub use store::{Document, DocumentStore, DocumentWrite, StoreError, WritePrecondition};
