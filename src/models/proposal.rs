use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::{check_items, LineItem, Reference};
use crate::{errors::ApiError, validation::{FieldErrors, Validate}};

/// Proposal lifecycle label. Clients set it directly; no transition rules apply.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProposalStatus {
    #[default]
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "sent")]
    Sent,
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "expired")]
    Expired,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 5] = [
        ProposalStatus::Draft,
        ProposalStatus::Sent,
        ProposalStatus::Accepted,
        ProposalStatus::Rejected,
        ProposalStatus::Expired,
    ];
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Draft => write!(f, "draft"),
            ProposalStatus::Sent => write!(f, "sent"),
            ProposalStatus::Accepted => write!(f, "accepted"),
            ProposalStatus::Rejected => write!(f, "rejected"),
            ProposalStatus::Expired => write!(f, "expired"),
        }
    }
}

impl TryFrom<String> for ProposalStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "draft" => Ok(ProposalStatus::Draft),
            "sent" => Ok(ProposalStatus::Sent),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            "expired" => Ok(ProposalStatus::Expired),
            _ => Err(format!("Invalid proposal status: {}", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    pub proposal_number: String,
    pub title: String,
    pub client_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub items: Json<Vec<LineItem>>,
    pub discount: f64,
    pub total: f64,
    #[sqlx(try_from = "String")]
    pub status: ProposalStatus,
    pub valid_until: Option<DateTime<Utc>>,
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
pub struct CreateProposal {
    pub title: String,
    pub client_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub status: ProposalStatus,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposal {
    pub title: Option<String>,
    pub client_id: Option<Uuid>,
    pub distributor_id: Option<Uuid>,
    pub items: Option<Vec<LineItem>>,
    pub discount: Option<f64>,
    pub status: Option<ProposalStatus>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// `PROP-YYYYMMDD-XXXXXX`, suffix taken from a fresh UUID.
pub fn generate_proposal_number(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("PROP-{}-{}", now.format("%Y%m%d"), suffix)
}

impl Validate for CreateProposal {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.required("title", &self.title);
        check_items(&mut errors, &self.items, self.discount);
        errors.finish()
    }
}

impl Validate for UpdateProposal {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("title", self.title.as_deref());
        if let Some(items) = &self.items {
            check_items(&mut errors, items, self.discount.unwrap_or(0.0));
        } else {
            errors.non_negative("discount", self.discount);
        }
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_proposal_number_format() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap();
        let number = generate_proposal_number(now);
        assert!(number.starts_with("PROP-20240517-"));
        assert_eq!(number.len(), "PROP-20240517-".len() + 6);
        assert_ne!(number, generate_proposal_number(now));
    }

    #[test]
    fn test_status_strings() {
        for status in ProposalStatus::ALL {
            assert_eq!(ProposalStatus::try_from(status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let update = UpdateProposal {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
