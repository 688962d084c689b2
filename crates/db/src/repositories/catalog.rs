use std::sync::Arc;

use dealdesk_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use dealdesk_core::domain::product::{Product, ProductId};
use dealdesk_core::domain::proposal::Proposal;
use dealdesk_core::domain::rule::Rule;
use dealdesk_core::domain::tenant::TenantId;
use dealdesk_core::errors::{ApplicationError, DomainError, ValidationIssue};
use dealdesk_core::extraction::CatalogBatch;

use super::{decode, encode, RepositoryError};
use crate::paths::{CollectionPath, PRODUCTS, PRODUCT_RULES, PROPOSALS};
use crate::store::{DocumentStore, DocumentWrite, WritePrecondition};

/// Products and rules for one tenant's catalog, including the atomic
/// approval batch write.
#[derive(Clone)]
pub struct CatalogRepository {
    store: Arc<dyn DocumentStore>,
}

impl CatalogRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn products(&self, tenant_id: &TenantId) -> CollectionPath {
        CollectionPath::tenant_scoped(tenant_id, PRODUCTS)
    }

    fn rules(&self, tenant_id: &TenantId) -> CollectionPath {
        CollectionPath::tenant_scoped(tenant_id, PRODUCT_RULES)
    }

    pub async fn save_product(
        &self,
        tenant_id: &TenantId,
        product: &Product,
    ) -> Result<(), RepositoryError> {
        let path = self.products(tenant_id).doc(&product.id.0);
        self.store.put(&path, encode(product)?, WritePrecondition::None).await?;
        Ok(())
    }

    pub async fn find_product(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let path = self.products(tenant_id).doc(&product_id.0);
        match self.store.get(&path).await? {
            Some(document) => Ok(Some(decode(&document)?)),
            None => Ok(None),
        }
    }

    pub async fn list_products(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.store
            .list(&self.products(tenant_id))
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    pub async fn save_rule(
        &self,
        tenant_id: &TenantId,
        rule: &Rule,
    ) -> Result<(), RepositoryError> {
        let path = self.rules(tenant_id).doc(&rule.id.0);
        self.store.put(&path, encode(rule)?, WritePrecondition::None).await?;
        Ok(())
    }

    pub async fn list_rules(&self, tenant_id: &TenantId) -> Result<Vec<Rule>, RepositoryError> {
        self.store.list(&self.rules(tenant_id)).await?.iter().map(decode).collect()
    }

    pub async fn list_active_rules(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<Rule>, RepositoryError> {
        Ok(self.list_rules(tenant_id).await?.into_iter().filter(Rule::is_active).collect())
    }

    /// Persists an approved extraction batch in one atomic write: every
    /// product and every mapped rule, or nothing. A batch colliding with an
    /// existing document id fails whole.
    pub async fn commit_batch(
        &self,
        tenant_id: &TenantId,
        batch: &CatalogBatch,
    ) -> Result<(), RepositoryError> {
        let mut writes = Vec::with_capacity(batch.products.len() + batch.rules.len());
        for product in &batch.products {
            writes.push(DocumentWrite {
                path: self.products(tenant_id).doc(&product.id.0),
                body: encode(product)?,
                precondition: WritePrecondition::MustNotExist,
            });
        }
        for rule in &batch.rules {
            writes.push(DocumentWrite {
                path: self.rules(tenant_id).doc(&rule.id.0),
                body: encode(rule)?,
                precondition: WritePrecondition::MustNotExist,
            });
        }

        self.store.batch_write(writes).await?;
        Ok(())
    }

    /// `commit_batch` with an audit trail of the outcome.
    pub async fn commit_batch_audited(
        &self,
        tenant_id: &TenantId,
        batch: &CatalogBatch,
        sink: &dyn AuditSink,
        audit: &AuditContext,
    ) -> Result<(), RepositoryError> {
        let result = self.commit_batch(tenant_id, batch).await;

        match &result {
            Ok(()) => sink.emit(
                AuditEvent::new(
                    None,
                    Some(tenant_id.clone()),
                    audit.correlation_id.clone(),
                    "catalog.batch_committed",
                    AuditCategory::Persistence,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("products", batch.products.len().to_string())
                .with_metadata("rules", batch.rules.len().to_string()),
            ),
            Err(error) => sink.emit(
                AuditEvent::new(
                    None,
                    Some(tenant_id.clone()),
                    audit.correlation_id.clone(),
                    "catalog.batch_failed",
                    AuditCategory::Persistence,
                    audit.actor.clone(),
                    AuditOutcome::Failed,
                )
                .with_metadata("error", error.to_string()),
            ),
        }

        result
    }

    /// Catalog "duplicate" action: stores an unverified copy with a fresh id
    /// and returns it.
    pub async fn duplicate_product(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<Product, ApplicationError> {
        let original = self
            .find_product(tenant_id, product_id)
            .await
            .map_err(ApplicationError::from)?
            .ok_or_else(|| {
                ApplicationError::Domain(DomainError::NotFound {
                    entity: "product",
                    id: product_id.0.clone(),
                })
            })?;
        let copy = original.duplicate();
        self.save_product(tenant_id, &copy).await.map_err(ApplicationError::from)?;
        Ok(copy)
    }

    /// Hard delete, guarded by referential use: a product still referenced
    /// by an active rule or a live proposal stays.
    pub async fn delete_product(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<(), ApplicationError> {
        let rules = self.list_rules(tenant_id).await.map_err(ApplicationError::from)?;
        for rule in rules.iter().filter(|rule| rule.is_active()) {
            if rule.primary_product_id == *product_id
                || rule.related_product_ids.contains(product_id)
            {
                return Err(ApplicationError::Domain(DomainError::validation(
                    ValidationIssue::new(
                        "product",
                        format!("product {} is referenced by active rule {}", product_id.0, rule.id.0),
                    ),
                )));
            }
        }

        let proposals = self
            .store
            .list(&CollectionPath::tenant_scoped(tenant_id, PROPOSALS))
            .await
            .map_err(RepositoryError::from)
            .map_err(ApplicationError::from)?;
        for document in &proposals {
            let proposal: Proposal =
                decode(document).map_err(ApplicationError::from)?;
            if proposal.status.is_terminal() {
                continue;
            }
            if proposal.selected_products.iter().any(|line| line.product_id == *product_id) {
                return Err(ApplicationError::Domain(DomainError::validation(
                    ValidationIssue::new(
                        "product",
                        format!(
                            "product {} is referenced by proposal {}",
                            product_id.0, proposal.id.0
                        ),
                    ),
                )));
            }
        }

        let path = self.products(tenant_id).doc(&product_id.0);
        self.store.delete(&path).await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use dealdesk_core::domain::client::ClientId;
    use dealdesk_core::domain::product::{
        PricingModel, Product, ProductId, ProductStatus, ProductType,
    };
    use dealdesk_core::domain::proposal::{Proposal, Section, SectionOrigin};
    use dealdesk_core::domain::rule::{Rule, RuleCondition, RuleStatus, RuleType};
    use dealdesk_core::domain::tenant::TenantId;
    use dealdesk_core::errors::{ApplicationError, DomainError};
    use dealdesk_core::extraction::CatalogBatch;
    use dealdesk_core::resolve::ResolvedLineItem;
    use rust_decimal::Decimal;

    use super::CatalogRepository;
    use crate::memory::InMemoryDocumentStore;
    use crate::paths::{CollectionPath, PROPOSALS};
    use crate::store::{DocumentStore, WritePrecondition};

    fn tenant() -> TenantId {
        TenantId("t-1".to_string())
    }

    fn product(name: &str) -> Product {
        Product::new(
            name,
            format!("{name} description"),
            Decimal::new(10_000, 2),
            PricingModel::Subscription,
            ProductType::Product,
        )
    }

    #[tokio::test]
    async fn batch_commit_is_all_or_nothing() {
        let repository = CatalogRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let colliding = product("Platform");
        repository.save_product(&tenant(), &colliding).await.expect("seed");

        let fresh = product("Analytics");
        let batch = CatalogBatch {
            products: vec![fresh.clone(), colliding.clone()],
            rules: vec![],
        };

        repository.commit_batch(&tenant(), &batch).await.expect_err("collision fails batch");
        assert!(
            repository.find_product(&tenant(), &fresh.id).await.expect("find").is_none(),
            "no partial catalog after a failed batch"
        );

        let clean = CatalogBatch { products: vec![fresh.clone()], rules: vec![] };
        repository.commit_batch(&tenant(), &clean).await.expect("clean batch commits");
        assert!(repository.find_product(&tenant(), &fresh.id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn audited_batch_commit_records_both_outcomes() {
        use dealdesk_core::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};

        let repository = CatalogRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(None, None, "req-9", "approval-review");

        let fresh = product("Analytics");
        let batch = CatalogBatch { products: vec![fresh.clone()], rules: vec![] };
        repository
            .commit_batch_audited(&tenant(), &batch, &sink, &context)
            .await
            .expect("commit");
        repository
            .commit_batch_audited(&tenant(), &batch, &sink, &context)
            .await
            .expect_err("id collision");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "catalog.batch_committed");
        assert_eq!(events[0].metadata.get("products").map(String::as_str), Some("1"));
        assert_eq!(events[1].event_type, "catalog.batch_failed");
        assert_eq!(events[1].outcome, AuditOutcome::Failed);
    }

    #[tokio::test]
    async fn active_rule_blocks_product_deletion() {
        let repository = CatalogRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let platform = product("Platform");
        let addon = product("Addon");
        repository.save_product(&tenant(), &platform).await.expect("save");
        repository.save_product(&tenant(), &addon).await.expect("save");

        let mut rule = Rule::new(
            platform.id.clone(),
            vec![addon.id.clone()],
            RuleType::Dependency,
            RuleCondition::RequiresAll,
        );
        rule.status = RuleStatus::Active;
        repository.save_rule(&tenant(), &rule).await.expect("save rule");

        let error = repository
            .delete_product(&tenant(), &addon.id)
            .await
            .expect_err("referenced product");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation { .. })));

        // Dormant rules do not block.
        rule.status = RuleStatus::AwaitingReview;
        repository.save_rule(&tenant(), &rule).await.expect("update rule");
        repository.delete_product(&tenant(), &addon.id).await.expect("deletable now");
    }

    #[tokio::test]
    async fn live_proposal_blocks_product_deletion() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repository = CatalogRepository::new(store.clone());
        let platform = product("Platform");
        repository.save_product(&tenant(), &platform).await.expect("save");

        let proposal = Proposal::new(
            tenant(),
            ClientId("c-1".to_string()),
            "agent-1",
            vec![Section {
                title: "Scope".to_string(),
                content: "scope".to_string(),
                origin: SectionOrigin::Manual,
            }],
            vec![ResolvedLineItem {
                product_id: platform.id.clone(),
                quantity: 1,
                unit_price: Decimal::new(10_000, 2),
                line_total: Decimal::new(10_000, 2),
            }],
            Utc::now(),
        );
        let path = CollectionPath::tenant_scoped(&tenant(), PROPOSALS).doc(&proposal.id.0);
        store
            .put(&path, serde_json::to_value(&proposal).expect("encode"), WritePrecondition::None)
            .await
            .expect("store proposal");

        let error = repository
            .delete_product(&tenant(), &platform.id)
            .await
            .expect_err("referenced by live proposal");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn duplicating_a_product_stores_an_unverified_copy() {
        let repository = CatalogRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let mut original = product("Platform");
        original.status = ProductStatus::Verified;
        repository.save_product(&tenant(), &original).await.expect("save");

        let copy = repository
            .duplicate_product(&tenant(), &original.id)
            .await
            .expect("duplicate");
        assert_ne!(copy.id, original.id);
        let stored = repository
            .find_product(&tenant(), &copy.id)
            .await
            .expect("find")
            .expect("copy persisted");
        assert_eq!(stored.name, "Platform (copy)");

        let missing = repository
            .duplicate_product(&tenant(), &ProductId("nope".into()))
            .await
            .expect_err("unknown product");
        assert!(matches!(missing, ApplicationError::Domain(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn active_rule_filter_excludes_awaiting_review() {
        let repository = CatalogRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let platform = product("Platform");
        let addon = product("Addon");

        let mut active = Rule::new(
            platform.id.clone(),
            vec![addon.id.clone()],
            RuleType::Dependency,
            RuleCondition::RequiresAll,
        );
        active.status = RuleStatus::Active;
        let pending = Rule::new(
            addon.id.clone(),
            vec![platform.id.clone()],
            RuleType::Recommendation,
            RuleCondition::RequiresOne,
        );

        repository.save_rule(&tenant(), &active).await.expect("save");
        repository.save_rule(&tenant(), &pending).await.expect("save");

        let rules = repository.list_active_rules(&tenant()).await.expect("list");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, active.id);
    }
}
