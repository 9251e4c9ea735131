use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Page window requested by the caller, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Reads `page` and `limit`. Missing, unparseable or non-positive values
    /// fall back to the defaults so the offset can never go negative.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let page = parse_positive(params.get("page")).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(params.get("limit"))
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(value: Option<&String>) -> Option<i64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
}

/// `pagination` block of the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
    pub limit: i64,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total: i64) -> Self {
        let total = total.max(0);
        Self {
            current: pagination.page,
            pages: page_count(total, pagination.limit),
            total,
            limit: pagination.limit,
        }
    }
}

/// `ceil(total / limit)` in integer arithmetic.
pub fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Slices an in-memory collection the same way the SQL paginator does.
pub fn paginate_slice<T>(items: Vec<T>, pagination: Pagination) -> Vec<T> {
    let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(pagination.limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}
