use dealdesk_core::domain::proposal::ProposalId;
use dealdesk_core::domain::tenant::TenantId;

pub const TENANTS: &str = "tenants";
pub const PRODUCTS: &str = "products";
pub const PRODUCT_RULES: &str = "product_rules";
pub const PROPOSALS: &str = "proposals";
pub const SUGGESTED_EDITS: &str = "suggested_edits";
pub const VERSIONS: &str = "versions";
pub const CLIENTS: &str = "clients";

/// A document collection addressed as a slash-delimited path. Top-level
/// collections hold tenant records; everything else is scoped under
/// `tenants/{tenantId}`, with suggested edits and versions nested one level
/// deeper under their proposal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn tenants() -> Self {
        Self(TENANTS.to_string())
    }

    pub fn tenant_scoped(tenant_id: &TenantId, collection: &str) -> Self {
        Self(format!("{TENANTS}/{}/{collection}", tenant_id.0))
    }

    pub fn proposal_scoped(
        tenant_id: &TenantId,
        proposal_id: &ProposalId,
        collection: &str,
    ) -> Self {
        Self(format!("{TENANTS}/{}/{PROPOSALS}/{}/{collection}", tenant_id.0, proposal_id.0))
    }

    pub fn doc(&self, id: &str) -> DocPath {
        DocPath { collection: self.clone(), id: id.to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn doc_id(&self) -> &str {
        &self.id
    }

    pub fn render(&self) -> String {
        format!("{}/{}", self.collection.as_str(), self.id)
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection.as_str(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use dealdesk_core::domain::proposal::ProposalId;
    use dealdesk_core::domain::tenant::TenantId;

    use super::{CollectionPath, PRODUCTS, SUGGESTED_EDITS};

    #[test]
    fn renders_tenant_scoped_paths() {
        let tenant = TenantId("t-acme".to_string());
        let path = CollectionPath::tenant_scoped(&tenant, PRODUCTS).doc("p-1");
        assert_eq!(path.render(), "tenants/t-acme/products/p-1");
    }

    #[test]
    fn renders_proposal_nested_paths() {
        let tenant = TenantId("t-acme".to_string());
        let proposal = ProposalId("prop-9".to_string());
        let path =
            CollectionPath::proposal_scoped(&tenant, &proposal, SUGGESTED_EDITS).doc("edit-1");
        assert_eq!(path.render(), "tenants/t-acme/proposals/prop-9/suggested_edits/edit-1");
    }
}
