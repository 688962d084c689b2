use thiserror::Error;

use crate::domain::product::ProductId;
use crate::domain::proposal::ProposalStatus;
use crate::domain::suggested_edit::SuggestedEditId;
use crate::domain::tenant::SubscriptionTier;
use crate::gate::Feature;

/// A single field-level problem found while validating untrusted input.
/// `index` is the position of the offending record in its source batch, so
/// callers can point the user at the exact product or rule that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub index: Option<usize>,
    pub field: String,
    pub message: String,
    pub record_name: Option<String>,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { index: None, field: field.into(), message: message.into(), record_name: None }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn named(mut self, record_name: impl Into<String>) -> Self {
        self.record_name = Some(record_name.into());
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("feature {feature:?} requires tier {required:?}, tenant is {actual:?}")]
    PermissionDenied { feature: Feature, required: SubscriptionTier, actual: SubscriptionTier },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed with {} issue(s)", issues.len())]
    Validation { issues: Vec<ValidationIssue> },
    #[error("rule graph contains a cycle through {product_ids:?}")]
    CyclicRuleGraph { product_ids: Vec<ProductId> },
    #[error("selection contains conflicting products {first:?} and {second:?}")]
    ConflictingSelection { first: ProductId, second: ProductId },
    #[error("invalid proposal transition from {from:?} on {event}")]
    InvalidTransition { from: ProposalStatus, event: &'static str },
    #[error("suggested edit {edit_id:?} has already been resolved")]
    AlreadyResolved { edit_id: SuggestedEditId },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(issue: ValidationIssue) -> Self {
        Self::Validation { issues: vec![issue] }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("concurrent modification of {entity} {id}: expected version {expected}, found {actual}")]
    ConcurrentModification { entity: &'static str, id: String, expected: u64, actual: u64 },
    #[error("extraction service failure: {0}")]
    ExtractionFailed(String),
    #[error("drafting service failure: {0}")]
    DraftingFailed(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Concurrent modification losers may simply reload and retry; everything
    /// else needs user action or operator attention first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => {
                "The proposal changed while you were editing. Reload and retry."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Domain(domain) => Self::BadRequest {
                message: domain.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::ConcurrentModification { entity, id, expected, actual } => {
                Self::Conflict {
                    message: format!(
                        "{entity} {id} moved from version {expected} to {actual} during the request"
                    ),
                    correlation_id: "unassigned".to_owned(),
                }
            }
            ApplicationError::Persistence(message)
            | ApplicationError::ExtractionFailed(message)
            | ApplicationError::DraftingFailed(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
