use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::ProductId;
use crate::errors::{DomainError, ValidationIssue};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Dependency,
    Conflict,
    Recommendation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    RequiresOne,
    RequiresAll,
    ConflictsWith,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    AwaitingReview,
}

/// A structured relationship between catalog products. `multiplier = Some(n)`
/// means "every n units of the primary product imply one unit of each related
/// product", applied with ceiling division during resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub primary_product_id: ProductId,
    pub related_product_ids: Vec<ProductId>,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub condition: RuleCondition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
    pub status: RuleStatus,
}

impl Rule {
    pub fn new(
        primary_product_id: ProductId,
        related_product_ids: Vec<ProductId>,
        rule_type: RuleType,
        condition: RuleCondition,
    ) -> Self {
        Self {
            id: RuleId(Uuid::new_v4().to_string()),
            primary_product_id,
            related_product_ids,
            rule_type,
            condition,
            multiplier: None,
            status: RuleStatus::AwaitingReview,
        }
    }

    pub fn with_multiplier(mut self, every_n: u32) -> Self {
        self.multiplier = Some(every_n);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    pub fn is_dependency(&self) -> bool {
        matches!(self.condition, RuleCondition::RequiresOne | RuleCondition::RequiresAll)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut issues = Vec::new();
        if self.related_product_ids.is_empty() {
            issues.push(ValidationIssue::new(
                "relatedProductIds",
                "rule must reference at least one related product",
            ));
        }
        if self.related_product_ids.contains(&self.primary_product_id) {
            issues.push(ValidationIssue::new(
                "relatedProductIds",
                format!("rule may not reference its own trigger {}", self.primary_product_id.0),
            ));
        }
        if self.multiplier == Some(0) {
            issues.push(ValidationIssue::new("multiplier", "multiplier must be at least 1"));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation { issues })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Rule, RuleCondition, RuleType};
    use crate::domain::product::ProductId;

    fn product(id: &str) -> ProductId {
        ProductId(id.to_string())
    }

    #[test]
    fn self_referencing_rule_is_rejected() {
        let rule = Rule::new(
            product("analytics"),
            vec![product("storage"), product("analytics")],
            RuleType::Dependency,
            RuleCondition::RequiresAll,
        );

        let error = rule.validate().expect_err("self reference");
        assert!(error.to_string().contains("1 issue"));
    }

    #[test]
    fn empty_related_products_are_rejected() {
        let rule =
            Rule::new(product("analytics"), vec![], RuleType::Dependency, RuleCondition::RequiresAll);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let rule = Rule::new(
            product("seats"),
            vec![product("support-hours")],
            RuleType::Dependency,
            RuleCondition::RequiresAll,
        )
        .with_multiplier(0);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn well_formed_rule_passes() {
        let rule = Rule::new(
            product("seats"),
            vec![product("support-hours")],
            RuleType::Dependency,
            RuleCondition::RequiresAll,
        )
        .with_multiplier(10);
        assert!(rule.validate().is_ok());
    }
}
