use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::proposal::ProposalId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(pub String);

/// Append-only history entry; immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub id: VersionId,
    pub proposal_id: ProposalId,
    pub version_number: u64,
    pub author_id: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(
        proposal_id: ProposalId,
        version_number: u64,
        author_id: impl Into<String>,
        summary: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VersionId(Uuid::new_v4().to_string()),
            proposal_id,
            version_number,
            author_id: author_id.into(),
            summary: summary.into(),
            created_at: now,
        }
    }
}
