use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Reference;
use crate::{errors::ApiError, validation::{FieldErrors, Validate}};

/// Quantity-based price break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub min_quantity: i32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceListItem {
    pub id: Uuid,
    pub distributor_id: Uuid,
    pub product_id: Uuid,
    pub price: f64,
    pub promotional_price: Option<f64>,
    #[schema(value_type = Vec<PricingTier>)]
    pub pricing_tiers: Json<Vec<PricingTier>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distributor: Option<Reference>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub product: Option<Reference>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePriceListItem {
    pub distributor_id: Uuid,
    pub product_id: Uuid,
    pub price: f64,
    pub promotional_price: Option<f64>,
    #[serde(default)]
    pub pricing_tiers: Vec<PricingTier>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceListItem {
    pub distributor_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub price: Option<f64>,
    pub promotional_price: Option<f64>,
    pub pricing_tiers: Option<Vec<PricingTier>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// All price-list items of one distributor, as served by the grouped view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributorPriceList {
    pub distributor: Reference,
    pub item_count: usize,
    pub items: Vec<PriceListItem>,
}

fn check_tiers(errors: &mut FieldErrors, tiers: &[PricingTier]) {
    for (index, tier) in tiers.iter().enumerate() {
        if tier.min_quantity < 1 {
            errors.add(
                format!("pricingTiers[{}].minQuantity", index),
                "minQuantity must be at least 1",
            );
        }
        errors.non_negative(&format!("pricingTiers[{}].price", index), Some(tier.price));
    }
}

impl Validate for CreatePriceListItem {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.non_negative("price", Some(self.price));
        errors.non_negative("promotionalPrice", self.promotional_price);
        check_tiers(&mut errors, &self.pricing_tiers);
        errors.date_order("validFrom", self.valid_from, "validUntil", self.valid_until);
        errors.finish()
    }
}

impl Validate for UpdatePriceListItem {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.non_negative("price", self.price);
        errors.non_negative("promotionalPrice", self.promotional_price);
        if let Some(tiers) = &self.pricing_tiers {
            check_tiers(&mut errors, tiers);
        }
        errors.date_order("validFrom", self.valid_from, "validUntil", self.valid_until);
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item() -> CreatePriceListItem {
        CreatePriceListItem {
            distributor_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            price: 280.0,
            promotional_price: None,
            pricing_tiers: vec![],
            valid_from: None,
            valid_until: None,
            notes: None,
            is_active: None,
        }
    }

    #[test]
    fn test_valid_item() {
        assert!(item().validate().is_ok());
    }

    #[test]
    fn test_validity_window_must_be_ordered() {
        let now = Utc::now();
        let mut invalid = item();
        invalid.valid_from = Some(now);
        invalid.valid_until = Some(now - Duration::days(1));
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_tiers_are_checked() {
        let mut invalid = item();
        invalid.pricing_tiers = vec![PricingTier {
            min_quantity: 0,
            price: -2.0,
        }];
        match invalid.validate() {
            Err(ApiError::Validation { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
