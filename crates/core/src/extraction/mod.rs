use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::product::{PricingModel, Product, ProductId, ProductStatus, ProductType};
use crate::domain::rule::{Rule, RuleCondition, RuleStatus, RuleType};
use crate::errors::{DomainError, ValidationIssue};

/// A product candidate as recovered from the document-understanding
/// service, after schema validation but before approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProduct {
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    pub pricing_model: PricingModel,
    #[serde(rename = "type")]
    pub product_type: ProductType,
}

/// A free-text rule recommendation from the extraction service. Deliberately
/// a different type from [`Rule`]: natural-language suggestions are never
/// executable until a human maps them onto real product ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedRuleText {
    pub name: String,
    pub description: String,
    pub condition: String,
    pub action: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub products: Vec<ExtractedProduct>,
    pub rules: Vec<SuggestedRuleText>,
}

/// Schema-checks the raw service output. Collects every problem before
/// failing so the caller can render the complete list; never returns a
/// partially validated catalog.
pub fn validate_extraction(raw: &Value) -> Result<ExtractionOutput, DomainError> {
    let Some(root) = raw.as_object() else {
        return Err(DomainError::validation(ValidationIssue::new(
            "$",
            "extraction output must be a JSON object",
        )));
    };

    let mut issues = Vec::new();
    let mut products = Vec::new();
    let mut rules = Vec::new();

    match root.get("products") {
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                match validate_product_entry(index, entry) {
                    Ok(product) => products.push(product),
                    Err(mut entry_issues) => issues.append(&mut entry_issues),
                }
            }
        }
        Some(_) => issues.push(ValidationIssue::new("products", "must be an array")),
        None => issues.push(ValidationIssue::new("products", "required field is missing")),
    }

    match root.get("rules") {
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                match validate_rule_entry(index, entry) {
                    Ok(rule) => rules.push(rule),
                    Err(mut entry_issues) => issues.append(&mut entry_issues),
                }
            }
        }
        Some(_) => issues.push(ValidationIssue::new("rules", "must be an array")),
        // Rule suggestions are optional; a document with no detectable
        // relationships is a valid outcome.
        None => {}
    }

    if issues.is_empty() {
        Ok(ExtractionOutput { products, rules })
    } else {
        Err(DomainError::Validation { issues })
    }
}

fn validate_product_entry(index: usize, entry: &Value) -> Result<ExtractedProduct, Vec<ValidationIssue>> {
    let Some(fields) = entry.as_object() else {
        return Err(vec![ValidationIssue::new("products", "entry must be an object").at(index)]);
    };

    let name_hint = fields.get("name").and_then(Value::as_str).map(str::to_owned);
    let tag = |issue: ValidationIssue| match &name_hint {
        Some(name) => issue.at(index).named(name.clone()),
        None => issue.at(index),
    };

    let mut issues = Vec::new();

    let name = match fields.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Some(name.to_owned()),
        Some(_) => {
            issues.push(tag(ValidationIssue::new("name", "must not be empty")));
            None
        }
        None => {
            issues.push(tag(ValidationIssue::new("name", "required string is missing")));
            None
        }
    };

    let description = match fields.get("description").and_then(Value::as_str) {
        Some(description) => Some(description.to_owned()),
        None => {
            issues.push(tag(ValidationIssue::new("description", "required string is missing")));
            None
        }
    };

    let base_price = match fields.get("basePrice") {
        Some(Value::Number(number)) => match Decimal::from_str(&number.to_string()) {
            Ok(price) if price >= Decimal::ZERO => Some(price),
            Ok(_) => {
                issues.push(tag(ValidationIssue::new("basePrice", "must be non-negative")));
                None
            }
            Err(_) => {
                issues.push(tag(ValidationIssue::new("basePrice", "not a representable decimal")));
                None
            }
        },
        Some(_) => {
            issues.push(tag(ValidationIssue::new("basePrice", "must be a number")));
            None
        }
        None => {
            issues.push(tag(ValidationIssue::new("basePrice", "required number is missing")));
            None
        }
    };

    let pricing_model = match fields.get("pricingModel").and_then(Value::as_str) {
        Some(value) => match PricingModel::from_wire(value) {
            Some(model) => Some(model),
            None => {
                issues.push(tag(ValidationIssue::new(
                    "pricingModel",
                    format!("unknown value {value:?}; expected one-time, subscription or per_item"),
                )));
                None
            }
        },
        None => {
            issues.push(tag(ValidationIssue::new("pricingModel", "required string is missing")));
            None
        }
    };

    let product_type = match fields.get("type").and_then(Value::as_str) {
        Some(value) => match ProductType::from_wire(value) {
            Some(kind) => Some(kind),
            None => {
                issues.push(tag(ValidationIssue::new(
                    "type",
                    format!("unknown value {value:?}; expected product, service or license"),
                )));
                None
            }
        },
        None => {
            issues.push(tag(ValidationIssue::new("type", "required string is missing")));
            None
        }
    };

    match (name, description, base_price, pricing_model, product_type) {
        (Some(name), Some(description), Some(base_price), Some(pricing_model), Some(product_type))
            if issues.is_empty() =>
        {
            Ok(ExtractedProduct { name, description, base_price, pricing_model, product_type })
        }
        _ => Err(issues),
    }
}

fn validate_rule_entry(index: usize, entry: &Value) -> Result<SuggestedRuleText, Vec<ValidationIssue>> {
    let Some(fields) = entry.as_object() else {
        return Err(vec![ValidationIssue::new("rules", "entry must be an object").at(index)]);
    };

    let mut issues = Vec::new();
    let mut require = |field: &str| match fields.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Some(value.to_owned()),
        Some(_) => {
            issues.push(ValidationIssue::new(format!("rules.{field}"), "must not be empty").at(index));
            None
        }
        None => {
            issues.push(
                ValidationIssue::new(format!("rules.{field}"), "required string is missing")
                    .at(index),
            );
            None
        }
    };

    let name = require("name");
    let description = require("description");
    let condition = require("condition");
    let action = require("action");

    match (name, description, condition, action) {
        (Some(name), Some(description), Some(condition), Some(action)) if issues.is_empty() => {
            Ok(SuggestedRuleText { name, description, condition, action })
        }
        _ => Err(issues),
    }
}

/// How a human-mapped rule draft refers to a product: either one of the
/// products being approved in the same batch (by position) or one already
/// in the tenant's catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductRef {
    Approved(usize),
    Existing(ProductId),
}

/// A structured rule authored during the "verify and approve" step, mapping
/// a [`SuggestedRuleText`] onto concrete products.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDraft {
    pub primary: ProductRef,
    pub related: Vec<ProductRef>,
    pub rule_type: RuleType,
    pub condition: RuleCondition,
    pub multiplier: Option<u32>,
}

/// The unit of the atomic approval write: either every product and rule in
/// the batch commits, or none of them do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogBatch {
    pub products: Vec<Product>,
    pub rules: Vec<Rule>,
}

/// Materializes approved extraction candidates and human rule mappings into
/// a consistent batch. Every rule reference must land on a product in this
/// batch or in the existing catalog; a draft with a dangling reference
/// rejects the whole batch, because a partially committed catalog is worse
/// than none.
pub fn build_approval_batch(
    approved_products: Vec<ExtractedProduct>,
    rule_drafts: Vec<RuleDraft>,
    existing_catalog: &[Product],
) -> Result<CatalogBatch, DomainError> {
    let mut issues = Vec::new();

    let products: Vec<Product> = approved_products
        .into_iter()
        .map(|candidate| {
            let mut product = Product::new(
                candidate.name,
                candidate.description,
                candidate.base_price,
                candidate.pricing_model,
                candidate.product_type,
            );
            product.status = ProductStatus::Verified;
            product
        })
        .collect();

    for (index, product) in products.iter().enumerate() {
        if let Err(DomainError::Validation { issues: mut product_issues }) = product.validate() {
            for issue in &mut product_issues {
                issue.index = Some(index);
            }
            issues.append(&mut product_issues);
        }
    }

    let resolve_ref = |reference: &ProductRef, issues: &mut Vec<ValidationIssue>, index: usize| {
        match reference {
            ProductRef::Approved(position) => match products.get(*position) {
                Some(product) => Some(product.id.clone()),
                None => {
                    issues.push(
                        ValidationIssue::new(
                            "rules",
                            format!("draft references approved product position {position} out of range"),
                        )
                        .at(index),
                    );
                    None
                }
            },
            ProductRef::Existing(product_id) => {
                if existing_catalog.iter().any(|product| product.id == *product_id) {
                    Some(product_id.clone())
                } else {
                    issues.push(
                        ValidationIssue::new(
                            "rules",
                            format!("draft references unknown catalog product {}", product_id.0),
                        )
                        .at(index),
                    );
                    None
                }
            }
        }
    };

    let mut rules = Vec::new();
    for (index, draft) in rule_drafts.iter().enumerate() {
        let primary = resolve_ref(&draft.primary, &mut issues, index);
        let related: Vec<ProductId> = draft
            .related
            .iter()
            .filter_map(|reference| resolve_ref(reference, &mut issues, index))
            .collect();

        let Some(primary) = primary else { continue };
        if related.len() != draft.related.len() {
            continue;
        }

        let mut rule = Rule::new(primary, related, draft.rule_type, draft.condition);
        rule.multiplier = draft.multiplier;
        rule.status = RuleStatus::Active;

        if let Err(DomainError::Validation { issues: mut rule_issues }) = rule.validate() {
            for issue in &mut rule_issues {
                issue.index = Some(index);
            }
            issues.append(&mut rule_issues);
            continue;
        }
        rules.push(rule);
    }

    if issues.is_empty() {
        Ok(CatalogBatch { products, rules })
    } else {
        Err(DomainError::Validation { issues })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        build_approval_batch, validate_extraction, ProductRef, RuleDraft,
    };
    use crate::domain::product::{PricingModel, Product, ProductId, ProductType};
    use crate::domain::rule::{RuleCondition, RuleStatus, RuleType};
    use crate::errors::DomainError;

    fn valid_payload() -> serde_json::Value {
        json!({
            "products": [
                {
                    "name": "Platform License",
                    "description": "Annual platform license",
                    "basePrice": 1200.50,
                    "pricingModel": "subscription",
                    "type": "license"
                },
                {
                    "name": "Onboarding",
                    "description": "One-time onboarding package",
                    "basePrice": 500,
                    "pricingModel": "one-time",
                    "type": "service"
                }
            ],
            "rules": [
                {
                    "name": "License needs onboarding",
                    "description": "New licenses include onboarding",
                    "condition": "When a platform license is purchased",
                    "action": "Add the onboarding package"
                }
            ]
        })
    }

    #[test]
    fn well_formed_output_validates_into_typed_candidates() {
        let output = validate_extraction(&valid_payload()).expect("valid payload");

        assert_eq!(output.products.len(), 2);
        assert_eq!(output.products[0].base_price, Decimal::new(120_050, 2));
        assert_eq!(output.products[0].pricing_model, PricingModel::Subscription);
        assert_eq!(output.products[1].product_type, ProductType::Service);
        assert_eq!(output.rules.len(), 1);
        assert_eq!(output.rules[0].name, "License needs onboarding");
    }

    #[test]
    fn missing_base_price_names_the_offending_product() {
        let mut payload = valid_payload();
        payload["products"][1].as_object_mut().expect("object").remove("basePrice");

        let error = validate_extraction(&payload).expect_err("missing basePrice");
        let DomainError::Validation { issues } = error else { panic!("expected validation") };

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "basePrice");
        assert_eq!(issues[0].index, Some(1));
        assert_eq!(issues[0].record_name.as_deref(), Some("Onboarding"));
    }

    #[test]
    fn all_problems_are_reported_together() {
        let payload = json!({
            "products": [
                { "name": "", "description": "x", "basePrice": -3, "pricingModel": "freemium", "type": "gadget" }
            ],
            "rules": [ { "name": "r" } ]
        });

        let error = validate_extraction(&payload).expect_err("many issues");
        let DomainError::Validation { issues } = error else { panic!("expected validation") };
        assert!(issues.len() >= 5, "got {issues:?}");
    }

    #[test]
    fn non_object_output_is_rejected() {
        assert!(validate_extraction(&json!([1, 2, 3])).is_err());
        assert!(validate_extraction(&json!(null)).is_err());
    }

    #[test]
    fn empty_but_successful_output_is_valid() {
        let output =
            validate_extraction(&json!({ "products": [], "rules": [] })).expect("empty catalog");
        assert!(output.products.is_empty());
        assert!(output.rules.is_empty());
    }

    #[test]
    fn approval_batch_activates_mapped_rules() {
        let output = validate_extraction(&valid_payload()).expect("valid payload");
        let drafts = vec![RuleDraft {
            primary: ProductRef::Approved(0),
            related: vec![ProductRef::Approved(1)],
            rule_type: RuleType::Dependency,
            condition: RuleCondition::RequiresAll,
            multiplier: None,
        }];

        let batch = build_approval_batch(output.products, drafts, &[]).expect("consistent batch");

        assert_eq!(batch.products.len(), 2);
        assert_eq!(batch.rules.len(), 1);
        assert_eq!(batch.rules[0].status, RuleStatus::Active);
        assert_eq!(batch.rules[0].primary_product_id, batch.products[0].id);
        assert_eq!(batch.rules[0].related_product_ids, vec![batch.products[1].id.clone()]);
    }

    #[test]
    fn dangling_catalog_reference_rejects_the_whole_batch() {
        let output = validate_extraction(&valid_payload()).expect("valid payload");
        let drafts = vec![RuleDraft {
            primary: ProductRef::Approved(0),
            related: vec![ProductRef::Existing(ProductId("no-such-product".to_string()))],
            rule_type: RuleType::Dependency,
            condition: RuleCondition::RequiresAll,
            multiplier: None,
        }];

        let error = build_approval_batch(output.products, drafts, &[]).expect_err("dangling ref");
        assert!(matches!(error, DomainError::Validation { .. }));
    }

    #[test]
    fn existing_catalog_products_are_valid_rule_targets() {
        let existing = Product::new(
            "Support",
            "Standard support",
            Decimal::new(10_000, 2),
            PricingModel::Subscription,
            ProductType::Service,
        );
        let existing_id = existing.id.clone();

        let output = validate_extraction(&valid_payload()).expect("valid payload");
        let drafts = vec![RuleDraft {
            primary: ProductRef::Approved(0),
            related: vec![ProductRef::Existing(existing_id.clone())],
            rule_type: RuleType::Dependency,
            condition: RuleCondition::RequiresAll,
            multiplier: Some(10),
        }];

        let batch = build_approval_batch(output.products, drafts, &[existing])
            .expect("existing reference resolves");
        assert_eq!(batch.rules[0].related_product_ids, vec![existing_id]);
        assert_eq!(batch.rules[0].multiplier, Some(10));
    }
}
