use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dealdesk_core::domain::product::{
    PricingModel, Product, ProductId, ProductStatus, ProductType,
};
use dealdesk_core::domain::rule::{Rule, RuleCondition, RuleId, RuleStatus, RuleType};
use dealdesk_core::domain::tenant::{SubscriptionStatus, SubscriptionTier, Tenant, TenantId};
use dealdesk_core::resolve::resolve;
use dealdesk_core::config::{AppConfig, LoadOptions};
use dealdesk_db::{
    connect_with_settings, CatalogRepository, SqliteDocumentStore, TenantRepository,
};
use rust_decimal::Decimal;

use crate::commands::CommandResult;

/// Fixed ids and timestamps keep reruns byte-identical; every write goes
/// through the normal repositories, so seeding doubles as a smoke test of
/// the persistence path.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let store = SqliteDocumentStore::new(pool.clone());
        store.ensure_schema().await.map_err(|error| ("schema", error.to_string(), 5u8))?;

        let store: Arc<SqliteDocumentStore> = Arc::new(store);
        let tenants = TenantRepository::new(store.clone());
        let catalog = CatalogRepository::new(store);

        let seeded_at = DateTime::<Utc>::UNIX_EPOCH;
        let tenant = demo_tenant(seeded_at);
        tenants.save(&tenant).await.map_err(|error| ("seed_tenant", error.to_string(), 5u8))?;

        for product in demo_products() {
            catalog
                .save_product(&tenant.id, &product)
                .await
                .map_err(|error| ("seed_catalog", error.to_string(), 5u8))?;
        }
        for rule in demo_rules() {
            catalog
                .save_rule(&tenant.id, &rule)
                .await
                .map_err(|error| ("seed_rules", error.to_string(), 5u8))?;
        }

        // Resolve a known selection against what was just written; a broken
        // seed fails loudly instead of producing a quietly wrong demo.
        let products =
            catalog.list_products(&tenant.id).await.map_err(|e| ("seed_verification", e.to_string(), 6u8))?;
        let rules = catalog
            .list_active_rules(&tenant.id)
            .await
            .map_err(|e| ("seed_verification", e.to_string(), 6u8))?;

        let mut selection = BTreeMap::new();
        selection.insert(ProductId("prod-platform".to_string()), 1);
        selection.insert(ProductId("prod-device".to_string()), 23);
        let resolved = resolve(&selection, &rules, &products)
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if resolved.display_total() != Decimal::new(366_100, 2) {
            return Err((
                "seed_verification",
                format!("demo resolution total drifted to {}", resolved.display_total()),
                6u8,
            ));
        }

        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(format!(
            "demo tenant `{}` seeded: {} products, {} active rules; demo selection resolves to {} line items totalling {}",
            tenant.id.0,
            products.len(),
            rules.len(),
            resolved.line_items.len(),
            resolved.display_total(),
        ))
    });

    match result {
        Ok(message) => CommandResult::success("seed", message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn demo_tenant(created_at: DateTime<Utc>) -> Tenant {
    Tenant {
        id: TenantId("t-demo".to_string()),
        name: "Demo Industries".to_string(),
        tier: SubscriptionTier::Pro,
        subscription_status: SubscriptionStatus::Active,
        created_at,
    }
}

fn demo_products() -> Vec<Product> {
    let product = |id: &str, name: &str, description: &str, cents: i64, model, kind| Product {
        id: ProductId(id.to_string()),
        name: name.to_string(),
        description: description.to_string(),
        base_price: Decimal::new(cents, 2),
        pricing_model: model,
        product_type: kind,
        status: ProductStatus::Verified,
    };

    vec![
        product(
            "prod-platform",
            "Platform License",
            "Annual platform license",
            120_000,
            PricingModel::Subscription,
            ProductType::License,
        ),
        product(
            "prod-onboarding",
            "Onboarding",
            "One-time onboarding and training package",
            50_000,
            PricingModel::OneTime,
            ProductType::Service,
        ),
        product(
            "prod-device",
            "Field Device",
            "Ruggedized field device",
            8_500,
            PricingModel::PerItem,
            ProductType::Product,
        ),
        product(
            "prod-sim",
            "Data SIM",
            "Connectivity SIM, one per ten devices",
            200,
            PricingModel::Subscription,
            ProductType::Product,
        ),
    ]
}

fn demo_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: RuleId("rule-platform-onboarding".to_string()),
            primary_product_id: ProductId("prod-platform".to_string()),
            related_product_ids: vec![ProductId("prod-onboarding".to_string())],
            rule_type: RuleType::Dependency,
            condition: RuleCondition::RequiresAll,
            multiplier: None,
            status: RuleStatus::Active,
        },
        Rule {
            id: RuleId("rule-device-sim".to_string()),
            primary_product_id: ProductId("prod-device".to_string()),
            related_product_ids: vec![ProductId("prod-sim".to_string())],
            rule_type: RuleType::Dependency,
            condition: RuleCondition::RequiresAll,
            multiplier: Some(10),
            status: RuleStatus::Active,
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use dealdesk_core::domain::product::ProductId;
    use dealdesk_core::resolve::resolve;
    use rust_decimal::Decimal;

    use super::{demo_products, demo_rules};

    #[test]
    fn demo_selection_resolves_to_the_pinned_total() {
        let products = demo_products();
        let rules = demo_rules();

        let mut selection = BTreeMap::new();
        selection.insert(ProductId("prod-platform".to_string()), 1);
        selection.insert(ProductId("prod-device".to_string()), 23);

        let resolved = resolve(&selection, &rules, &products).expect("demo catalog resolves");

        // 1200.00 platform + 23 x 85.00 devices + 500.00 onboarding
        // + 3 x 2.00 SIMs (23 devices, one SIM per 10).
        assert_eq!(resolved.display_total(), Decimal::new(366_100, 2));
        assert_eq!(resolved.line_items.len(), 4);
        assert_eq!(resolved.auto_added.len(), 2);
    }

    #[test]
    fn demo_fixtures_pass_domain_validation() {
        for product in demo_products() {
            product.validate().expect("demo product valid");
        }
        for rule in demo_rules() {
            rule.validate().expect("demo rule valid");
        }
    }
}
