use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub zip_code: Option<String>,
}

impl Address {
    pub fn check(&self, errors: &mut FieldErrors, prefix: &str) {
        errors.uf(&format!("{}.uf", prefix), self.uf.as_deref());
    }

    /// State codes are stored upper-case.
    pub fn normalized(mut self) -> Self {
        self.uf = self.uf.map(|uf| uf.trim().to_ascii_uppercase());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    pub fn check(&self, errors: &mut FieldErrors, prefix: &str) {
        errors.email(&format!("{}.email", prefix), self.email.as_deref());
    }
}

/// A priced line on a sale or proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Sum of line subtotals minus the discount.
pub fn items_total(items: &[LineItem], discount: f64) -> f64 {
    items.iter().map(LineItem::subtotal).sum::<f64>() - discount
}

pub fn check_items(errors: &mut FieldErrors, items: &[LineItem], discount: f64) {
    if items.is_empty() {
        errors.add("items", "at least one item is required");
    }
    for (index, item) in items.iter().enumerate() {
        if !item.quantity.is_finite() || item.quantity <= 0.0 {
            errors.add(format!("items[{}].quantity", index), "quantity must be greater than zero");
        }
        errors.non_negative(&format!("items[{}].unitPrice", index), Some(item.unit_price));
    }
    errors.non_negative("discount", Some(discount));
    if errors.is_empty() {
        check_total(errors, items, discount);
    }
}

/// Derives the total and records why it cannot be stored, if it cannot.
pub fn check_total(errors: &mut FieldErrors, items: &[LineItem], discount: f64) -> f64 {
    let total = items_total(items, discount);
    if !total.is_finite() {
        errors.add("items", "items total is out of range");
    } else if total < 0.0 {
        errors.add("discount", "discount cannot exceed the items total");
    }
    total
}

/// Inline summary of a referenced record, attached on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reference {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, unit_price: f64) -> LineItem {
        LineItem {
            product_id: None,
            description: None,
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_items_total() {
        let items = vec![item(2.0, 150.0), item(1.0, 99.9)];
        assert!((items_total(&items, 49.9) - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_check_items_rejects_bad_lines() {
        let mut errors = FieldErrors::new();
        check_items(&mut errors, &[item(0.0, 10.0), item(1.0, -1.0)], 0.0);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_discount_cannot_make_total_negative() {
        let mut errors = FieldErrors::new();
        check_items(&mut errors, &[item(1.0, 10.0)], 20.0);
        assert!(errors.finish().is_err());

        let mut errors = FieldErrors::new();
        check_items(&mut errors, &[item(1.0, 10.0)], 10.0);
        assert!(errors.finish().is_ok());
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let mut errors = FieldErrors::new();
        check_items(&mut errors, &[item(1e308, 10.0)], 0.0);
        match errors.finish() {
            Err(crate::errors::ApiError::Validation { errors }) => {
                assert_eq!(errors[0].field, "items");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let mut errors = FieldErrors::new();
        check_items(&mut errors, &[item(1e308, 1.0), item(1e308, 1.0)], 0.0);
        assert!(errors.finish().is_err());
    }

    #[test]
    fn test_address_uf_is_upper_cased() {
        let address = Address {
            uf: Some(" sp ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(address.uf.as_deref(), Some("SP"));
    }
}
