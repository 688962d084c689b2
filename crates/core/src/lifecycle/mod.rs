use chrono::{DateTime, Utc};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::proposal::{Proposal, ProposalStatus, SignatureData};
use crate::domain::suggested_edit::{EditStatus, SuggestedEdit};
use crate::domain::version::VersionRecord;
use crate::errors::DomainError;

/// Events that drive the proposal status machine. Pure transitions live in
/// [`transition`]; [`ProposalLifecycle`] wraps them with guards and the
/// aggregate mutations they imply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalEvent {
    Send,
    Resend,
    FirstView,
    Accept,
    Sign,
    Pay,
    Decline,
    RequestChanges,
}

impl ProposalEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Resend => "resend",
            Self::FirstView => "first_view",
            Self::Accept => "accept",
            Self::Sign => "sign",
            Self::Pay => "pay",
            Self::Decline => "decline",
            Self::RequestChanges => "request_changes",
        }
    }
}

/// The bare status machine: which status an event leads to from where.
pub fn transition(
    current: ProposalStatus,
    event: ProposalEvent,
) -> Result<ProposalStatus, DomainError> {
    use ProposalEvent::{Accept, Decline, FirstView, Pay, RequestChanges, Resend, Send, Sign};
    use ProposalStatus::{
        Accepted, ChangesRequested, Declined, Draft, Paid, Sent, Signed, Viewed,
    };

    let next = match (current, event) {
        (Draft, Send) => Sent,
        (ChangesRequested, Resend) => Sent,
        (Sent, FirstView) => Viewed,
        (Sent | Viewed | ChangesRequested, Accept) => Accepted,
        (Sent | Viewed | ChangesRequested, Sign) => Signed,
        (Sent | Viewed | Accepted | Signed, Pay) => Paid,
        (Sent | Viewed | ChangesRequested, Decline) => Declined,
        (Sent | Viewed | ChangesRequested, RequestChanges) => ChangesRequested,
        (from, event) => {
            return Err(DomainError::InvalidTransition { from, event: event.as_str() });
        }
    };

    Ok(next)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditDecision {
    Accept,
    Reject,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ProposalLifecycle;

impl ProposalLifecycle {
    /// `draft -> sent`. Only the owning agent may send, and only a proposal
    /// with content: at least one section and one resolved line item.
    pub fn send(
        &self,
        proposal: &mut Proposal,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.require_owner(proposal, agent_id)?;
        if proposal.sections.is_empty() {
            return Err(DomainError::InvariantViolation(
                "proposal cannot be sent without at least one section".to_owned(),
            ));
        }
        if proposal.selected_products.is_empty() {
            return Err(DomainError::InvariantViolation(
                "proposal cannot be sent without at least one line item".to_owned(),
            ));
        }

        proposal.status = transition(proposal.status, ProposalEvent::Send)?;
        proposal.updated_at = now;
        Ok(())
    }

    /// `changes_requested -> sent` after the agent reworks the draft.
    pub fn resend(
        &self,
        proposal: &mut Proposal,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.require_owner(proposal, agent_id)?;
        proposal.status = transition(proposal.status, ProposalEvent::Resend)?;
        proposal.updated_at = now;
        Ok(())
    }

    /// Records an external view. The `sent -> viewed` transition fires only
    /// on the first view; every view bumps the engagement counter. Viewing
    /// never fails, even on terminal proposals (read-only access).
    pub fn record_view(&self, proposal: &mut Proposal, now: DateTime<Utc>) {
        proposal.engagement.view_count += 1;
        proposal.engagement.last_viewed_at = Some(now);
        if proposal.status == ProposalStatus::Sent {
            // Infallible here by construction.
            if let Ok(next) = transition(proposal.status, ProposalEvent::FirstView) {
                proposal.status = next;
            }
            proposal.updated_at = now;
        }
    }

    pub fn accept(&self, proposal: &mut Proposal, now: DateTime<Utc>) -> Result<(), DomainError> {
        proposal.status = transition(proposal.status, ProposalEvent::Accept)?;
        proposal.updated_at = now;
        Ok(())
    }

    /// Signing records an immutable timestamp plus an audit digest tying
    /// the signature to the exact proposal version signed.
    pub fn sign(
        &self,
        proposal: &mut Proposal,
        signer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let next = transition(proposal.status, ProposalEvent::Sign)?;
        let digest = blake3::hash(
            format!("{}:{}:{}:{}", proposal.id.0, proposal.version, signer_id, now.to_rfc3339())
                .as_bytes(),
        );
        proposal.signature = Some(SignatureData {
            signer_id: signer_id.to_owned(),
            signed_at: now,
            audit_reference: digest.to_hex().to_string(),
        });
        proposal.status = next;
        proposal.updated_at = now;
        Ok(())
    }

    pub fn mark_paid(
        &self,
        proposal: &mut Proposal,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        proposal.status = transition(proposal.status, ProposalEvent::Pay)?;
        proposal.payment = Some(crate::domain::proposal::PaymentData {
            paid_at: now,
            payment_reference: payment_reference.to_owned(),
        });
        proposal.updated_at = now;
        Ok(())
    }

    pub fn decline(&self, proposal: &mut Proposal, now: DateTime<Utc>) -> Result<(), DomainError> {
        proposal.status = transition(proposal.status, ProposalEvent::Decline)?;
        proposal.updated_at = now;
        Ok(())
    }

    /// Registers a collaborator's suggested edit. Allowed only while the
    /// proposal is still actionable; implicitly moves it to
    /// `changes_requested`.
    pub fn submit_suggested_edit(
        &self,
        proposal: &mut Proposal,
        section_index: usize,
        suggested_content: impl Into<String>,
        author_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<SuggestedEdit, DomainError> {
        if !proposal.status.is_actionable() {
            return Err(DomainError::InvalidTransition {
                from: proposal.status,
                event: ProposalEvent::RequestChanges.as_str(),
            });
        }
        if section_index >= proposal.sections.len() {
            return Err(DomainError::NotFound {
                entity: "section",
                id: section_index.to_string(),
            });
        }

        let edit =
            SuggestedEdit::new(proposal.id.clone(), section_index, suggested_content, author_id, now);

        if proposal.status != ProposalStatus::ChangesRequested {
            proposal.status = transition(proposal.status, ProposalEvent::RequestChanges)?;
        }
        proposal.updated_at = now;
        Ok(edit)
    }

    /// Resolves a pending edit. Acceptance rewrites the target section,
    /// bumps the proposal version and returns the new [`VersionRecord`] to
    /// append; rejection touches nothing but the edit status. Either way an
    /// edit resolves exactly once.
    pub fn resolve_suggested_edit(
        &self,
        proposal: &mut Proposal,
        edit: &mut SuggestedEdit,
        decision: EditDecision,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VersionRecord>, DomainError> {
        self.require_owner(proposal, agent_id)?;
        if edit.proposal_id != proposal.id {
            return Err(DomainError::InvariantViolation(format!(
                "suggested edit {} targets proposal {}, not {}",
                edit.id.0, edit.proposal_id.0, proposal.id.0
            )));
        }
        if !edit.is_pending() {
            return Err(DomainError::AlreadyResolved { edit_id: edit.id.clone() });
        }

        match decision {
            EditDecision::Reject => {
                edit.status = EditStatus::Rejected;
                Ok(None)
            }
            EditDecision::Accept => {
                let Some(section) = proposal.sections.get_mut(edit.section_index) else {
                    return Err(DomainError::NotFound {
                        entity: "section",
                        id: edit.section_index.to_string(),
                    });
                };

                let summary = format!(
                    "Section \"{}\" revised via suggested edit by {} ({} -> {} chars)",
                    section.title,
                    edit.author_id,
                    section.content.chars().count(),
                    edit.suggested_content.chars().count(),
                );

                section.content = edit.suggested_content.clone();
                edit.status = EditStatus::Accepted;
                proposal.version += 1;
                proposal.updated_at = now;

                Ok(Some(VersionRecord::new(
                    proposal.id.clone(),
                    proposal.version,
                    agent_id,
                    summary,
                    now,
                )))
            }
        }
    }

    /// Same as the event methods, with an audit trail of the outcome.
    pub fn apply_with_audit<S>(
        &self,
        proposal: &mut Proposal,
        event: ProposalEvent,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<(), DomainError>
    where
        S: AuditSink,
    {
        let from = proposal.status;
        let result = match transition(from, event) {
            Ok(next) => {
                proposal.status = next;
                proposal.updated_at = now;
                Ok(())
            }
            Err(error) => Err(error),
        };

        match &result {
            Ok(()) => sink.emit(
                AuditEvent::new(
                    Some(proposal.id.clone()),
                    Some(proposal.tenant_id.clone()),
                    audit.correlation_id.clone(),
                    "lifecycle.transition_applied",
                    AuditCategory::Lifecycle,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("from", format!("{from:?}"))
                .with_metadata("to", format!("{:?}", proposal.status))
                .with_metadata("event", event.as_str()),
            ),
            Err(error) => sink.emit(
                AuditEvent::new(
                    Some(proposal.id.clone()),
                    Some(proposal.tenant_id.clone()),
                    audit.correlation_id.clone(),
                    "lifecycle.transition_rejected",
                    AuditCategory::Lifecycle,
                    audit.actor.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("error", error.to_string()),
            ),
        }

        result
    }

    fn require_owner(&self, proposal: &Proposal, agent_id: &str) -> Result<(), DomainError> {
        if proposal.is_owned_by(agent_id) {
            Ok(())
        } else {
            Err(DomainError::InvariantViolation(format!(
                "agent {agent_id} does not own proposal {}",
                proposal.id.0
            )))
        }
    }
}
