use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::proposal::ProposalId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestedEditId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A content change proposed by a non-owning collaborator. Only the owning
/// sales agent may resolve it, and only once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedEdit {
    pub id: SuggestedEditId,
    pub proposal_id: ProposalId,
    pub section_index: usize,
    pub suggested_content: String,
    pub author_id: String,
    pub status: EditStatus,
    pub created_at: DateTime<Utc>,
}

impl SuggestedEdit {
    pub fn new(
        proposal_id: ProposalId,
        section_index: usize,
        suggested_content: impl Into<String>,
        author_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SuggestedEditId(Uuid::new_v4().to_string()),
            proposal_id,
            section_index,
            suggested_content: suggested_content.into(),
            author_id: author_id.into(),
            status: EditStatus::Pending,
            created_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EditStatus::Pending
    }
}
