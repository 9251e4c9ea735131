use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{errors::ApiError, validation::{FieldErrors, Validate}};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub category: String,
    pub price: f64,
    pub cost_price: Option<f64>,
    pub unit: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub category: String,
    pub price: f64,
    pub cost_price: Option<f64>,
    pub unit: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub cost_price: Option<f64>,
    pub unit: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for CreateProduct {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        errors.required("category", &self.category);
        errors.non_negative("price", Some(self.price));
        errors.non_negative("costPrice", self.cost_price);
        errors.finish()
    }
}

impl Validate for UpdateProduct {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("name", self.name.as_deref());
        errors.not_blank("category", self.category.as_deref());
        errors.non_negative("price", self.price);
        errors.non_negative("costPrice", self.cost_price);
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_is_rejected() {
        let product = CreateProduct {
            name: "Router X".to_string(),
            category: "Equipamentos".to_string(),
            price: -300.0,
            ..Default::default()
        };
        match product.validate() {
            Err(ApiError::Validation { errors }) => assert_eq!(errors[0].field, "price"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_product_is_valid() {
        let product: CreateProduct = serde_json::from_value(serde_json::json!({
            "name": "Router X",
            "price": 300,
            "category": "Equipamentos"
        }))
        .unwrap();
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_update_rejects_negative_cost() {
        let update = UpdateProduct {
            cost_price: Some(-1.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
