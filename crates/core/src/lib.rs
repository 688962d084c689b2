pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod gate;
pub mod lifecycle;
pub mod resolve;

pub use domain::client::{Client, ClientId};
pub use domain::product::{PricingModel, Product, ProductId, ProductStatus, ProductType};
pub use domain::proposal::{
    EngagementData, PaymentData, Proposal, ProposalId, ProposalStatus, Section, SectionOrigin,
    SignatureData,
};
pub use domain::rule::{Rule, RuleCondition, RuleId, RuleStatus, RuleType};
pub use domain::suggested_edit::{EditStatus, SuggestedEdit, SuggestedEditId};
pub use domain::tenant::{SubscriptionStatus, SubscriptionTier, Tenant, TenantId};
pub use domain::version::{VersionId, VersionRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError, ValidationIssue};
pub use extraction::{
    build_approval_batch, validate_extraction, CatalogBatch, ExtractedProduct, ExtractionOutput,
    ProductRef, RuleDraft, SuggestedRuleText,
};
pub use gate::{Authorization, Feature, TierGate};
pub use lifecycle::{EditDecision, ProposalEvent, ProposalLifecycle};
pub use resolve::{
    resolve, resolve_with_audit, ResolvedLineItem, ResolvedSelection, SoftRequirement,
};
