use dealdesk_core::errors::ApplicationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::store::{Document, StoreError};

pub mod catalog;
pub mod proposal;
pub mod tenant;

pub use catalog::CatalogRepository;
pub use proposal::ProposalRepository;
pub use tenant::TenantRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value).map_err(|error| RepositoryError::Encode(error.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(document: &Document) -> Result<T, RepositoryError> {
    serde_json::from_value(document.body.clone()).map_err(|error| {
        RepositoryError::Store(StoreError::Decode {
            path: document.path.clone(),
            message: error.to_string(),
        })
    })
}
