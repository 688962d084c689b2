use std::sync::Arc;

use dealdesk_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use dealdesk_core::domain::proposal::{Section, SectionOrigin};
use dealdesk_core::domain::tenant::Tenant;
use dealdesk_core::errors::ApplicationError;
use dealdesk_core::extraction::{validate_extraction, ExtractionOutput};
use dealdesk_core::gate::{Feature, TierGate};

use crate::client::{DraftRequest, DraftingClient, ExtractionClient, ExtractionRequest};

/// Orchestrates the gated calls to the extraction service. The tier gate
/// always runs before the (costly) upstream call, and every outcome leaves
/// an audit event keyed on the request's correlation id.
pub struct ExtractionRuntime {
    extraction: Arc<dyn ExtractionClient>,
    drafting: Arc<dyn DraftingClient>,
    sink: Arc<dyn AuditSink>,
}

impl ExtractionRuntime {
    pub fn new(
        extraction: Arc<dyn ExtractionClient>,
        drafting: Arc<dyn DraftingClient>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self { extraction, drafting, sink }
    }

    fn authorize(
        &self,
        tenant: Option<&Tenant>,
        feature: Feature,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        if let Err(error) = TierGate::authorize(tenant, feature) {
            self.sink.emit(
                AuditEvent::new(
                    None,
                    tenant.map(|t| t.id.clone()),
                    correlation_id,
                    "gate.denied",
                    AuditCategory::Gate,
                    "extraction-runtime",
                    AuditOutcome::Rejected,
                )
                .with_metadata("feature", feature.as_str())
                .with_metadata("error", error.to_string()),
            );
            return Err(ApplicationError::Domain(error));
        }
        Ok(())
    }

    /// Full extraction flow: gate, call, validate. Validation failures come
    /// back as domain errors carrying the complete issue list; upstream
    /// failures and empty output surface as `ExtractionFailed`.
    pub async fn extract_catalog(
        &self,
        tenant: Option<&Tenant>,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutput, ApplicationError> {
        self.authorize(tenant, Feature::DocumentExtraction, &request.correlation_id)?;
        let tenant_id = tenant.map(|t| t.id.clone());

        let raw = match self.extraction.extract(request).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.emit_failure(
                    &tenant_id,
                    &request.correlation_id,
                    "service produced no structured output",
                );
                return Err(ApplicationError::ExtractionFailed(
                    "service produced no structured output".to_owned(),
                ));
            }
            Err(error) => {
                self.emit_failure(&tenant_id, &request.correlation_id, &error.to_string());
                return Err(ApplicationError::ExtractionFailed(error.to_string()));
            }
        };

        match validate_extraction(&raw) {
            Ok(output) => {
                self.sink.emit(
                    AuditEvent::new(
                        None,
                        tenant_id,
                        request.correlation_id.clone(),
                        "extraction.completed",
                        AuditCategory::Extraction,
                        "extraction-runtime",
                        AuditOutcome::Success,
                    )
                    .with_metadata("products", output.products.len().to_string())
                    .with_metadata("rule_suggestions", output.rules.len().to_string()),
                );
                Ok(output)
            }
            Err(error) => {
                self.sink.emit(
                    AuditEvent::new(
                        None,
                        tenant_id,
                        request.correlation_id.clone(),
                        "extraction.rejected",
                        AuditCategory::Extraction,
                        "extraction-runtime",
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("detail", error.to_string()),
                );
                Err(ApplicationError::Domain(error))
            }
        }
    }

    /// Drafts a proposal section. Gated separately from extraction; the
    /// result is marked [`SectionOrigin::Drafted`] so edits can be traced
    /// back to generated content.
    pub async fn draft_section(
        &self,
        tenant: Option<&Tenant>,
        request: &DraftRequest,
    ) -> Result<Section, ApplicationError> {
        self.authorize(tenant, Feature::ProposalDrafting, &request.correlation_id)?;
        let tenant_id = tenant.map(|t| t.id.clone());

        match self.drafting.draft(request).await {
            Ok(content) => {
                self.sink.emit(
                    AuditEvent::new(
                        None,
                        tenant_id,
                        request.correlation_id.clone(),
                        "drafting.completed",
                        AuditCategory::Extraction,
                        "extraction-runtime",
                        AuditOutcome::Success,
                    )
                    .with_metadata("section", request.section_title.clone()),
                );
                Ok(Section {
                    title: request.section_title.clone(),
                    content,
                    origin: SectionOrigin::Drafted,
                })
            }
            Err(error) => {
                self.sink.emit(
                    AuditEvent::new(
                        None,
                        tenant_id,
                        request.correlation_id.clone(),
                        "drafting.failed",
                        AuditCategory::Extraction,
                        "extraction-runtime",
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                Err(ApplicationError::DraftingFailed(error.to_string()))
            }
        }
    }

    fn emit_failure(
        &self,
        tenant_id: &Option<dealdesk_core::domain::tenant::TenantId>,
        correlation_id: &str,
        detail: &str,
    ) {
        self.sink.emit(
            AuditEvent::new(
                None,
                tenant_id.clone(),
                correlation_id,
                "extraction.failed",
                AuditCategory::Extraction,
                "extraction-runtime",
                AuditOutcome::Failed,
            )
            .with_metadata("detail", detail),
        );
    }
}
