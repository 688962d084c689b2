use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, ValidationIssue};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingModel {
    #[serde(rename = "one-time")]
    OneTime,
    #[serde(rename = "subscription")]
    Subscription,
    #[serde(rename = "per_item")]
    PerItem,
}

impl PricingModel {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "one-time" => Some(Self::OneTime),
            "subscription" => Some(Self::Subscription),
            "per_item" => Some(Self::PerItem),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Product,
    Service,
    License,
}

impl ProductType {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "product" => Some(Self::Product),
            "service" => Some(Self::Service),
            "license" => Some(Self::License),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Unverified,
    Verified,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    pub pricing_model: PricingModel,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub status: ProductStatus,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        base_price: Decimal,
        pricing_model: PricingModel,
        product_type: ProductType,
    ) -> Self {
        Self {
            id: ProductId(Uuid::new_v4().to_string()),
            name: name.into(),
            description: description.into(),
            base_price,
            pricing_model,
            product_type,
            status: ProductStatus::Unverified,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new("name", "product name must not be empty"));
        }
        if self.base_price < Decimal::ZERO {
            issues.push(
                ValidationIssue::new("basePrice", "base price must be non-negative")
                    .named(self.name.clone()),
            );
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation { issues })
        }
    }

    /// Copy for the catalog "duplicate" action: new id, unverified until a
    /// human reviews the copy.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ProductId(Uuid::new_v4().to_string()),
            name: format!("{} (copy)", self.name),
            status: ProductStatus::Unverified,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{PricingModel, Product, ProductStatus, ProductType};

    #[test]
    fn negative_price_fails_validation() {
        let mut product = Product::new(
            "Onboarding",
            "White-glove onboarding",
            Decimal::new(50_000, 2),
            PricingModel::OneTime,
            ProductType::Service,
        );
        product.base_price = Decimal::NEGATIVE_ONE;

        let error = product.validate().expect_err("negative price");
        assert!(error.to_string().contains("1 issue"));
    }

    #[test]
    fn duplicate_gets_fresh_id_and_unverified_status() {
        let mut product = Product::new(
            "API Access",
            "Programmatic access",
            Decimal::new(9_900, 2),
            PricingModel::Subscription,
            ProductType::License,
        );
        product.status = ProductStatus::Verified;

        let copy = product.duplicate();
        assert_ne!(copy.id, product.id);
        assert_eq!(copy.name, "API Access (copy)");
        assert_eq!(copy.status, ProductStatus::Unverified);
        assert_eq!(copy.base_price, product.base_price);
    }

    #[test]
    fn pricing_model_round_trips_wire_names() {
        assert_eq!(PricingModel::from_wire("one-time"), Some(PricingModel::OneTime));
        assert_eq!(PricingModel::from_wire("per_item"), Some(PricingModel::PerItem));
        assert_eq!(PricingModel::from_wire("freemium"), None);

        let wire = serde_json::to_string(&PricingModel::OneTime).expect("serialize");
        assert_eq!(wire, "\"one-time\"");
    }
}
