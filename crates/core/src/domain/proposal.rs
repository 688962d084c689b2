use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;
use crate::domain::tenant::TenantId;
use crate::resolve::ResolvedLineItem;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Signed,
    Paid,
    Declined,
    ChangesRequested,
}

impl ProposalStatus {
    /// Terminal with respect to client-side edits; agents may still read.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Signed | Self::Paid | Self::Declined)
    }

    /// States in which a client may still react to the proposal.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Sent | Self::Viewed | Self::ChangesRequested)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOrigin {
    Manual,
    Drafted,
    Imported,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    pub origin: SectionOrigin,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementData {
    pub view_count: u64,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    pub signer_id: String,
    pub signed_at: DateTime<Utc>,
    /// Content-derived digest tying the signature to the exact proposal
    /// version that was signed.
    pub audit_reference: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub paid_at: DateTime<Utc>,
    pub payment_reference: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    pub sales_agent_id: String,
    pub status: ProposalStatus,
    pub version: u64,
    pub sections: Vec<Section>,
    pub selected_products: Vec<ResolvedLineItem>,
    pub engagement: EngagementData,
    pub signature: Option<SignatureData>,
    pub payment: Option<PaymentData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(
        tenant_id: TenantId,
        client_id: ClientId,
        sales_agent_id: impl Into<String>,
        sections: Vec<Section>,
        selected_products: Vec<ResolvedLineItem>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId(Uuid::new_v4().to_string()),
            tenant_id,
            client_id,
            sales_agent_id: sales_agent_id.into(),
            status: ProposalStatus::Draft,
            version: 1,
            sections,
            selected_products,
            engagement: EngagementData::default(),
            signature: None,
            payment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Always derived from the line items; never persisted as independent
    /// ground truth.
    pub fn total_price(&self) -> Decimal {
        self.selected_products.iter().map(|line| line.line_total).sum()
    }

    /// Two-decimal rendering for documents and the portal; internal
    /// arithmetic stays at full precision.
    pub fn display_total(&self) -> Decimal {
        self.total_price().round_dp(2)
    }

    pub fn is_owned_by(&self, agent_id: &str) -> bool {
        self.sales_agent_id == agent_id
    }
}
