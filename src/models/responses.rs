use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::query::PaginationMeta;

/// Success envelope shared by every endpoint. Errors use the shape built by
/// [`crate::errors::ApiError`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pagination: Option<PaginationMeta>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
            message: None,
        }
    }

    pub fn paginated(data: T, pagination: PaginationMeta) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalStatusCounts {
    pub draft: i64,
    pub sent: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub expired: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub clients: i64,
    pub products: i64,
    pub distributors: i64,
    pub sales: i64,
    pub proposals: i64,
    pub price_list_items: i64,
    pub sales_total: f64,
    pub proposals_by_status: ProposalStatusCounts,
}
