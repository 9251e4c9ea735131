use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::{check_items, LineItem, Reference};
use crate::{errors::ApiError, validation::{FieldErrors, Validate}};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SaleStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "delivered")]
    Delivered,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleStatus::Pending => write!(f, "pending"),
            SaleStatus::Confirmed => write!(f, "confirmed"),
            SaleStatus::Delivered => write!(f, "delivered"),
            SaleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl TryFrom<String> for SaleStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(SaleStatus::Pending),
            "confirmed" => Ok(SaleStatus::Confirmed),
            "delivered" => Ok(SaleStatus::Delivered),
            "cancelled" => Ok(SaleStatus::Cancelled),
            _ => Err(format!("Invalid sale status: {}", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub client_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub items: Json<Vec<LineItem>>,
    pub discount: f64,
    pub total: f64,
    #[sqlx(try_from = "String")]
    pub status: SaleStatus,
    pub payment_method: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client: Option<Reference>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distributor: Option<Reference>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSale {
    pub client_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub status: SaleStatus,
    pub payment_method: Option<String>,
    pub sale_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSale {
    pub client_id: Option<Uuid>,
    pub distributor_id: Option<Uuid>,
    pub items: Option<Vec<LineItem>>,
    pub discount: Option<f64>,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<String>,
    pub sale_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for CreateSale {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_items(&mut errors, &self.items, self.discount);
        errors.finish()
    }
}

impl Validate for UpdateSale {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(items) = &self.items {
            check_items(&mut errors, items, self.discount.unwrap_or(0.0));
        } else {
            errors.non_negative("discount", self.discount);
        }
        errors.finish()
    }
}
