use serde::{Deserialize, Serialize};

use crate::domain::tenant::{SubscriptionTier, Tenant, TenantId};
use crate::errors::DomainError;

/// Gated features and the minimum tier each one requires. The table is
/// static on purpose: gating decisions must not depend on mutable runtime
/// state, only on the tenant snapshot handed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    DocumentExtraction,
    ProposalDrafting,
    RuleRecommendations,
    ProposalBuilder,
}

impl Feature {
    pub fn minimum_tier(&self) -> SubscriptionTier {
        match self {
            Self::DocumentExtraction => SubscriptionTier::Pro,
            Self::ProposalDrafting => SubscriptionTier::Pro,
            Self::RuleRecommendations => SubscriptionTier::Basic,
            Self::ProposalBuilder => SubscriptionTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentExtraction => "document_extraction",
            Self::ProposalDrafting => "proposal_drafting",
            Self::RuleRecommendations => "rule_recommendations",
            Self::ProposalBuilder => "proposal_builder",
        }
    }
}

/// Proof that a feature invocation cleared the gate for a tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub tenant_id: TenantId,
    pub feature: Feature,
    pub tier: SubscriptionTier,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TierGate;

impl TierGate {
    /// Pure gating decision. The caller passes the result of the tenant
    /// lookup directly so that "tenant missing" and "tenant under-tier"
    /// stay distinguishable. Must run before any costly extraction or
    /// drafting call is issued, never on the response path.
    pub fn authorize(
        tenant: Option<&Tenant>,
        feature: Feature,
    ) -> Result<Authorization, DomainError> {
        let Some(tenant) = tenant else {
            return Err(DomainError::NotFound { entity: "tenant", id: "unknown".to_owned() });
        };

        let required = feature.minimum_tier();
        if tenant.tier < required {
            return Err(DomainError::PermissionDenied {
                feature,
                required,
                actual: tenant.tier,
            });
        }

        Ok(Authorization { tenant_id: tenant.id.clone(), feature, tier: tenant.tier })
    }
}
