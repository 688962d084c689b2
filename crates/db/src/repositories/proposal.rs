use std::sync::Arc;

use dealdesk_core::domain::proposal::{Proposal, ProposalId};
use dealdesk_core::domain::suggested_edit::{SuggestedEdit, SuggestedEditId};
use dealdesk_core::domain::tenant::TenantId;
use dealdesk_core::domain::version::VersionRecord;
use dealdesk_core::errors::{ApplicationError, DomainError};

use super::{decode, encode, RepositoryError};
use crate::paths::{CollectionPath, DocPath, PROPOSALS, SUGGESTED_EDITS, VERSIONS};
use crate::store::{DocumentStore, DocumentWrite, StoreError, WritePrecondition};

/// Proposals plus their nested suggested edits and version history. Every
/// write to a proposal body is revision-guarded so concurrent agents cannot
/// silently overwrite each other.
#[derive(Clone)]
pub struct ProposalRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProposalRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn proposal_path(&self, tenant_id: &TenantId, proposal_id: &ProposalId) -> DocPath {
        CollectionPath::tenant_scoped(tenant_id, PROPOSALS).doc(&proposal_id.0)
    }

    fn edits(&self, tenant_id: &TenantId, proposal_id: &ProposalId) -> CollectionPath {
        CollectionPath::proposal_scoped(tenant_id, proposal_id, SUGGESTED_EDITS)
    }

    fn versions(&self, tenant_id: &TenantId, proposal_id: &ProposalId) -> CollectionPath {
        CollectionPath::proposal_scoped(tenant_id, proposal_id, VERSIONS)
    }

    fn map_conflict(proposal_id: &ProposalId, error: StoreError) -> ApplicationError {
        match error {
            StoreError::RevisionConflict { expected, actual, .. } => {
                ApplicationError::ConcurrentModification {
                    entity: "proposal",
                    id: proposal_id.0.clone(),
                    expected,
                    actual,
                }
            }
            other => ApplicationError::from(RepositoryError::from(other)),
        }
    }

    pub async fn create(&self, proposal: &Proposal) -> Result<u64, ApplicationError> {
        let path = self.proposal_path(&proposal.tenant_id, &proposal.id);
        let body = encode(proposal).map_err(ApplicationError::from)?;
        self.store
            .put(&path, body, WritePrecondition::MustNotExist)
            .await
            .map_err(|error| ApplicationError::from(RepositoryError::from(error)))
    }

    /// Returns the proposal together with the store revision callers must
    /// hand back on update.
    pub async fn find(
        &self,
        tenant_id: &TenantId,
        proposal_id: &ProposalId,
    ) -> Result<Option<(Proposal, u64)>, RepositoryError> {
        let path = self.proposal_path(tenant_id, proposal_id);
        match self.store.get(&path).await? {
            Some(document) => {
                let revision = document.revision;
                Ok(Some((decode(&document)?, revision)))
            }
            None => Ok(None),
        }
    }

    pub async fn require(
        &self,
        tenant_id: &TenantId,
        proposal_id: &ProposalId,
    ) -> Result<(Proposal, u64), ApplicationError> {
        self.find(tenant_id, proposal_id).await.map_err(ApplicationError::from)?.ok_or_else(|| {
            ApplicationError::Domain(DomainError::NotFound {
                entity: "proposal",
                id: proposal_id.0.clone(),
            })
        })
    }

    /// Optimistic-concurrency write. A stale `expected_revision` surfaces as
    /// `ConcurrentModification`; the loser reloads and retries.
    pub async fn update(
        &self,
        proposal: &Proposal,
        expected_revision: u64,
    ) -> Result<u64, ApplicationError> {
        let path = self.proposal_path(&proposal.tenant_id, &proposal.id);
        let body = encode(proposal).map_err(ApplicationError::from)?;
        self.store
            .put(&path, body, WritePrecondition::MustMatchRevision(expected_revision))
            .await
            .map_err(|error| Self::map_conflict(&proposal.id, error))
    }

    pub async fn list(&self, tenant_id: &TenantId) -> Result<Vec<Proposal>, RepositoryError> {
        self.store
            .list(&CollectionPath::tenant_scoped(tenant_id, PROPOSALS))
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    /// Stores a freshly submitted edit alongside the proposal status change
    /// it implied, in one batch.
    pub async fn submit_edit(
        &self,
        tenant_id: &TenantId,
        proposal: &Proposal,
        expected_revision: u64,
        edit: &SuggestedEdit,
    ) -> Result<(), ApplicationError> {
        let writes = vec![
            DocumentWrite {
                path: self.proposal_path(tenant_id, &proposal.id),
                body: encode(proposal).map_err(ApplicationError::from)?,
                precondition: WritePrecondition::MustMatchRevision(expected_revision),
            },
            DocumentWrite {
                path: self.edits(tenant_id, &proposal.id).doc(&edit.id.0),
                body: encode(edit).map_err(ApplicationError::from)?,
                precondition: WritePrecondition::MustNotExist,
            },
        ];
        self.store
            .batch_write(writes)
            .await
            .map_err(|error| Self::map_conflict(&proposal.id, error))
    }

    pub async fn find_edit(
        &self,
        tenant_id: &TenantId,
        proposal_id: &ProposalId,
        edit_id: &SuggestedEditId,
    ) -> Result<Option<(SuggestedEdit, u64)>, RepositoryError> {
        let path = self.edits(tenant_id, proposal_id).doc(&edit_id.0);
        match self.store.get(&path).await? {
            Some(document) => {
                let revision = document.revision;
                Ok(Some((decode(&document)?, revision)))
            }
            None => Ok(None),
        }
    }

    pub async fn list_edits(
        &self,
        tenant_id: &TenantId,
        proposal_id: &ProposalId,
    ) -> Result<Vec<SuggestedEdit>, RepositoryError> {
        self.store.list(&self.edits(tenant_id, proposal_id)).await?.iter().map(decode).collect()
    }

    /// Persists the outcome of an edit resolution atomically: the rewritten
    /// proposal, the resolved edit, and (on acceptance) the new version
    /// record. Revision guards on the proposal and the edit make the
    /// double-resolution race lose cleanly at the store.
    pub async fn commit_edit_resolution(
        &self,
        tenant_id: &TenantId,
        proposal: &Proposal,
        proposal_revision: u64,
        edit: &SuggestedEdit,
        edit_revision: u64,
        version: Option<&VersionRecord>,
    ) -> Result<(), ApplicationError> {
        let mut writes = vec![
            DocumentWrite {
                path: self.proposal_path(tenant_id, &proposal.id),
                body: encode(proposal).map_err(ApplicationError::from)?,
                precondition: WritePrecondition::MustMatchRevision(proposal_revision),
            },
            DocumentWrite {
                path: self.edits(tenant_id, &proposal.id).doc(&edit.id.0),
                body: encode(edit).map_err(ApplicationError::from)?,
                precondition: WritePrecondition::MustMatchRevision(edit_revision),
            },
        ];
        if let Some(record) = version {
            writes.push(DocumentWrite {
                path: self.versions(tenant_id, &proposal.id).doc(&record.id.0),
                body: encode(record).map_err(ApplicationError::from)?,
                precondition: WritePrecondition::MustNotExist,
            });
        }

        self.store
            .batch_write(writes)
            .await
            .map_err(|error| Self::map_conflict(&proposal.id, error))
    }

    pub async fn list_versions(
        &self,
        tenant_id: &TenantId,
        proposal_id: &ProposalId,
    ) -> Result<Vec<VersionRecord>, RepositoryError> {
        self.store.list(&self.versions(tenant_id, proposal_id)).await?.iter().map(decode).collect()
    }
}
