use std::sync::Arc;

use dealdesk_core::domain::tenant::{Tenant, TenantId};
use dealdesk_core::errors::{ApplicationError, DomainError};

use super::{decode, encode, RepositoryError};
use crate::paths::CollectionPath;
use crate::store::{DocumentStore, WritePrecondition};

#[derive(Clone)]
pub struct TenantRepository {
    store: Arc<dyn DocumentStore>,
}

impl TenantRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let path = CollectionPath::tenants().doc(&tenant.id.0);
        self.store.put(&path, encode(tenant)?, WritePrecondition::None).await?;
        Ok(())
    }

    pub async fn find(&self, tenant_id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let path = CollectionPath::tenants().doc(&tenant_id.0);
        match self.store.get(&path).await? {
            Some(document) => Ok(Some(decode(&document)?)),
            None => Ok(None),
        }
    }

    /// Lookup that surfaces a missing tenant as the domain-level `NotFound`
    /// the tier gate contract requires.
    pub async fn require(&self, tenant_id: &TenantId) -> Result<Tenant, ApplicationError> {
        self.find(tenant_id).await.map_err(ApplicationError::from)?.ok_or_else(|| {
            ApplicationError::Domain(DomainError::NotFound {
                entity: "tenant",
                id: tenant_id.0.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use dealdesk_core::domain::tenant::{
        SubscriptionStatus, SubscriptionTier, Tenant, TenantId,
    };
    use dealdesk_core::errors::{ApplicationError, DomainError};

    use super::TenantRepository;
    use crate::memory::InMemoryDocumentStore;

    #[tokio::test]
    async fn round_trips_tenants_and_requires_existing() {
        let repository = TenantRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let tenant = Tenant {
            id: TenantId("t-acme".to_string()),
            name: "Acme".to_string(),
            tier: SubscriptionTier::Pro,
            subscription_status: SubscriptionStatus::Active,
            created_at: Utc::now(),
        };

        repository.save(&tenant).await.expect("save");
        let loaded = repository.require(&tenant.id).await.expect("require");
        assert_eq!(loaded, tenant);

        let missing = repository
            .require(&TenantId("t-ghost".to_string()))
            .await
            .expect_err("missing tenant");
        assert!(matches!(
            missing,
            ApplicationError::Domain(DomainError::NotFound { entity: "tenant", .. })
        ));
    }
}
