use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::Address;
use crate::{errors::ApiError, validation::{FieldErrors, Validate}};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// CPF or CNPJ.
    pub document: Option<String>,
    pub address: Json<Address>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub document: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub document: Option<String>,
    pub address: Option<Address>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for CreateClient {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        errors.email("email", self.email.as_deref());
        self.address.check(&mut errors, "address");
        errors.finish()
    }
}

impl Validate for UpdateClient {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("name", self.name.as_deref());
        errors.email("email", self.email.as_deref());
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
    fn test_create_client_requires_name() {
        let client = CreateClient::default();
        assert!(client.validate().is_err());

        let client = CreateClient {
            name: "Padaria Central".to_string(),
            email: Some("contato@padaria.com.br".to_string()),
            ..Default::default()
        };
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_create_client_accepts_camel_case_payload() {
        let client: CreateClient = serde_json::from_value(serde_json::json!({
            "name": "Mercado Sol",
            "isActive": false,
            "address": { "city": "Campinas", "uf": "SP", "zipCode": "13000-000" }
        }))
        .unwrap();
        assert_eq!(client.is_active, Some(false));
        assert_eq!(client.address.zip_code.as_deref(), Some("13000-000"));
    }

    #[test]
    fn test_update_client_checks_only_sent_fields() {
        assert!(UpdateClient::default().validate().is_ok());

        let update = UpdateClient {
            name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
