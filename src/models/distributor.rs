use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::{Address, Contact};
use crate::{errors::ApiError, validation::{FieldErrors, Validate}};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Distributor {
    pub id: Uuid,
    pub name: String,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>,
    pub contact: Json<Contact>,
    pub address: Json<Address>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDistributor {
    pub name: String,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub address: Address,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDistributor {
    pub name: Option<String>,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>,
    pub contact: Option<Contact>,
    pub address: Option<Address>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for CreateDistributor {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        self.contact.check(&mut errors, "contact");
        self.address.check(&mut errors, "address");
        errors.finish()
    }
}

impl Validate for UpdateDistributor {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("name", self.name.as_deref());
        if let Some(contact) = &self.contact {
            contact.check(&mut errors, "contact");
        }
        if let Some(address) = &self.address {
            address.check(&mut errors, "address");
        }
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_email_is_checked() {
        let distributor = CreateDistributor {
            name: "Distribuidora Norte".to_string(),
            contact: Contact {
                email: Some("norte-at-example".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        match distributor.validate() {
            Err(ApiError::Validation { errors }) => assert_eq!(errors[0].field, "contact.email"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
