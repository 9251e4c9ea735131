//! Translates query-string parameters into SQL predicates.
//!
//! Each entity describes which of its columns are searchable, filterable and
//! sortable through a static [`FilterConfig`]. [`build_filter`] combines that
//! description with the caller's parameters and [`Scope`] into a [`Filter`],
//! which renders itself into a `sqlx::QueryBuilder` with bound parameters.

pub mod pagination;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::{ApiError, FieldError},
    models::UserRole,
};

pub use pagination::{Pagination, PaginationMeta};

pub const SEARCH_PARAM: &str = "search";
pub const DATE_FROM_PARAM: &str = "dateFrom";
pub const DATE_TO_PARAM: &str = "dateTo";
pub const SORT_BY_PARAM: &str = "sortBy";
pub const SORT_ORDER_PARAM: &str = "sortOrder";

/// Static description of what an entity's list endpoint can filter on.
///
/// Column entries are SQL expressions owned by the crate, never user input.
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    /// Columns OR-combined for the `search` parameter.
    pub search: &'static [&'static str],
    /// `(param, column)` pairs compared for equality.
    pub exact: &'static [(&'static str, &'static str)],
    /// `(param, column)` pairs naming uuid columns. Values must parse as uuids.
    pub references: &'static [(&'static str, &'static str)],
    /// `(param, column)` pairs holding `"true"`/`"false"`.
    pub flags: &'static [(&'static str, &'static str)],
    /// Timestamp column targeted by `dateFrom`/`dateTo`.
    pub date_column: Option<&'static str>,
    /// Column holding the owning user, `None` for unowned entities.
    pub owner_column: Option<&'static str>,
    /// `(param, column)` pairs accepted by `sortBy`.
    pub sortable: &'static [(&'static str, &'static str)],
    pub default_sort: &'static str,
}

/// Whose records a request may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Owner(Uuid),
}

impl Scope {
    /// Admins see everything; everyone else only what they created.
    pub fn for_user(user: &AuthUser) -> Self {
        match user.role {
            UserRole::Admin => Scope::Global,
            _ => Scope::Owner(user.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Id(Uuid),
    Search {
        columns: &'static [&'static str],
        pattern: String,
    },
    Equals {
        column: &'static str,
        value: String,
    },
    Refers {
        column: &'static str,
        id: Uuid,
    },
    Flag {
        column: &'static str,
        value: bool,
    },
    Range {
        column: &'static str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    OwnedBy {
        column: &'static str,
        user_id: Uuid,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Conjunction of predicates. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter selecting a single row, still honouring ownership.
    pub fn by_id(id: Uuid, config: &FilterConfig, scope: Scope) -> Self {
        let mut filter = Self::new();
        filter.push(Predicate::Id(id));
        filter.scope(config, scope);
        filter
    }

    /// Filter carrying only the ownership restriction.
    pub fn scoped(config: &FilterConfig, scope: Scope) -> Self {
        let mut filter = Self::new();
        filter.scope(config, scope);
        filter
    }

    /// The ownership restriction this filter carries, as a [`Scope`].
    pub fn owner_scope(&self) -> Scope {
        self.predicates
            .iter()
            .find_map(|predicate| match predicate {
                Predicate::OwnedBy { user_id, .. } => Some(Scope::Owner(*user_id)),
                _ => None,
            })
            .unwrap_or(Scope::Global)
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    fn scope(&mut self, config: &FilterConfig, scope: Scope) {
        if let (Some(column), Scope::Owner(user_id)) = (config.owner_column, scope) {
            self.push(Predicate::OwnedBy { column, user_id });
        }
    }

    /// Appends ` WHERE ...` (or nothing) to `query`.
    pub fn push_where(&self, query: &mut QueryBuilder<'_, Postgres>) {
        for (index, predicate) in self.predicates.iter().enumerate() {
            query.push(if index == 0 { " WHERE " } else { " AND " });
            push_predicate(query, predicate);
        }
    }
}

fn push_predicate(query: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Id(id) => {
            query.push("id = ");
            query.push_bind(*id);
        }
        Predicate::Search { columns, pattern } => {
            query.push("(");
            for (index, column) in columns.iter().enumerate() {
                if index > 0 {
                    query.push(" OR ");
                }
                query.push(*column);
                query.push(" ILIKE ");
                query.push_bind(pattern.clone());
            }
            query.push(")");
        }
        Predicate::Equals { column, value } => {
            query.push(*column);
            query.push(" = ");
            query.push_bind(value.clone());
        }
        Predicate::Refers { column, id } => {
            query.push(*column);
            query.push(" = ");
            query.push_bind(*id);
        }
        Predicate::Flag { column, value } => {
            query.push(*column);
            query.push(" = ");
            query.push_bind(*value);
        }
        Predicate::Range { column, from, to } => {
            query.push("(TRUE");
            if let Some(from) = from {
                query.push(" AND ");
                query.push(*column);
                query.push(" >= ");
                query.push_bind(*from);
            }
            if let Some(to) = to {
                query.push(" AND ");
                query.push(*column);
                query.push(" <= ");
                query.push_bind(*to);
            }
            query.push(")");
        }
        Predicate::OwnedBy { column, user_id } => {
            query.push(*column);
            query.push(" = ");
            query.push_bind(*user_id);
        }
    }
}

/// Builds the list filter for one request.
///
/// Missing or blank parameters are skipped. Malformed ids, dates and flags fail
/// the whole request instead of being ignored.
pub fn build_filter(
    params: &HashMap<String, String>,
    config: &FilterConfig,
    scope: Scope,
) -> Result<Filter, ApiError> {
    let mut filter = Filter::new();
    let mut errors = Vec::new();

    if let Some(term) = non_empty(params, SEARCH_PARAM) {
        if !config.search.is_empty() {
            filter.push(Predicate::Search {
                columns: config.search,
                pattern: format!("%{}%", escape_like(term)),
            });
        }
    }

    for &(param, column) in config.exact {
        if let Some(value) = non_empty(params, param) {
            filter.push(Predicate::Equals {
                column,
                value: value.to_string(),
            });
        }
    }

    for &(param, column) in config.references {
        if let Some(value) = non_empty(params, param) {
            match Uuid::parse_str(value) {
                Ok(id) => filter.push(Predicate::Refers { column, id }),
                Err(_) => errors.push(FieldError::new(
                    param,
                    format!("{} must be a valid id", param),
                )),
            }
        }
    }

    for &(param, column) in config.flags {
        if let Some(value) = non_empty(params, param) {
            match parse_flag(value) {
                Some(value) => filter.push(Predicate::Flag { column, value }),
                None => errors.push(FieldError::new(
                    param,
                    format!("{} must be 'true' or 'false'", param),
                )),
            }
        }
    }

    if let Some(column) = config.date_column {
        let from = parse_bound(params, DATE_FROM_PARAM, false, &mut errors);
        let to = parse_bound(params, DATE_TO_PARAM, true, &mut errors);
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                errors.push(FieldError::new(
                    DATE_TO_PARAM,
                    "dateTo must not be earlier than dateFrom",
                ));
            }
        }
        if from.is_some() || to.is_some() {
            filter.push(Predicate::Range { column, from, to });
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    filter.scope(config, scope);
    Ok(filter)
}

/// Resolves `sortBy`/`sortOrder` against the entity's sortable columns.
pub fn build_sort(params: &HashMap<String, String>, config: &FilterConfig) -> Result<Sort, ApiError> {
    let direction = match non_empty(params, SORT_ORDER_PARAM).map(str::to_ascii_lowercase) {
        None => SortDirection::Desc,
        Some(order) if order == "desc" => SortDirection::Desc,
        Some(order) if order == "asc" => SortDirection::Asc,
        Some(_) => {
            return Err(ApiError::invalid_field(
                SORT_ORDER_PARAM,
                "sortOrder must be 'asc' or 'desc'",
            ))
        }
    };

    let column = match non_empty(params, SORT_BY_PARAM) {
        None => config.default_sort,
        Some(key) => config
            .sortable
            .iter()
            .find(|(param, _)| *param == key)
            .map(|(_, column)| *column)
            .ok_or_else(|| {
                ApiError::invalid_field(SORT_BY_PARAM, format!("Cannot sort by '{}'", key))
            })?,
    };

    Ok(Sort { column, direction })
}

/// Appends ` ORDER BY` with `id` as the tie breaker.
pub fn push_order_by(query: &mut QueryBuilder<'_, Postgres>, sort: Sort) {
    query.push(" ORDER BY ");
    query.push(sort.column);
    query.push(" ");
    query.push(sort.direction.as_sql());
    query.push(", id ");
    query.push(sort.direction.as_sql());
}

pub fn push_limit_offset(query: &mut QueryBuilder<'_, Postgres>, pagination: Pagination) {
    query.push(" LIMIT ");
    query.push_bind(pagination.limit);
    query.push(" OFFSET ");
    query.push_bind(pagination.offset());
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Escapes `LIKE` metacharacters so the term is matched literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_bound(
    params: &HashMap<String, String>,
    param: &str,
    end_of_day: bool,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    let value = non_empty(params, param)?;
    match parse_date(value, end_of_day) {
        Some(date) => Some(date),
        None => {
            errors.push(FieldError::new(
                param,
                format!("{} must be an RFC 3339 timestamp or YYYY-MM-DD date", param),
            ));
            None
        }
    }
}

/// Accepts RFC 3339 timestamps and bare dates. A bare date resolves to the
/// start of the day, or to its last microsecond when `end_of_day` is set.
pub fn parse_date(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?
    } else {
        NaiveTime::MIN
    };
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_FILTERS: FilterConfig = FilterConfig {
        search: &["name", "description", "sku"],
        exact: &[("category", "category")],
        references: &[("distributorId", "distributor_id")],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: Some("created_by"),
        sortable: &[("name", "name"), ("price", "price")],
        default_sort: "created_at",
    };

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn render(filter: &Filter) -> String {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        filter.push_where(&mut query);
        query.sql().to_string()
    }

    #[test]
    fn test_empty_params_produce_empty_filter() {
        let filter = build_filter(&HashMap::new(), &PRODUCT_FILTERS, Scope::Global).unwrap();
        assert!(filter.is_empty());
        assert_eq!(render(&filter), "SELECT * FROM products");
    }

    #[test]
    fn test_blank_params_are_omitted() {
        let filter = build_filter(
            &params(&[("search", "  "), ("category", ""), ("isActive", "")]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_search_spans_all_configured_columns() {
        let filter =
            build_filter(&params(&[("search", "router")]), &PRODUCT_FILTERS, Scope::Global).unwrap();
        assert_eq!(
            filter.predicates(),
            &[Predicate::Search {
                columns: PRODUCT_FILTERS.search,
                pattern: "%router%".to_string(),
            }]
        );
        assert_eq!(
            render(&filter),
            "SELECT * FROM products WHERE (name ILIKE $1 OR description ILIKE $2 OR sku ILIKE $3)"
        );
    }

    #[test]
    fn test_search_escapes_like_metacharacters() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_exact_and_flag_filters() {
        let filter = build_filter(
            &params(&[("category", "Equipamentos"), ("isActive", "FALSE")]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap();
        assert_eq!(
            filter.predicates(),
            &[
                Predicate::Equals {
                    column: "category",
                    value: "Equipamentos".to_string()
                },
                Predicate::Flag {
                    column: "is_active",
                    value: false
                },
            ]
        );
        assert_eq!(
            render(&filter),
            "SELECT * FROM products WHERE category = $1 AND is_active = $2"
        );
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let err = build_filter(&params(&[("isActive", "yes")]), &PRODUCT_FILTERS, Scope::Global)
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[test]
    fn test_reference_filter_accepts_any_uuid_casing() {
        let id = Uuid::new_v4();
        let filter = build_filter(
            &params(&[("distributorId", &id.to_string().to_uppercase())]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap();
        assert_eq!(
            filter.predicates(),
            &[Predicate::Refers {
                column: "distributor_id",
                id
            }]
        );
        assert_eq!(render(&filter), "SELECT * FROM products WHERE distributor_id = $1");
    }

    #[test]
    fn test_malformed_reference_filter_is_rejected() {
        let err = build_filter(
            &params(&[("distributorId", "not-a-uuid")]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap_err();
        match err {
            ApiError::Validation { errors } => assert_eq!(errors[0].field, "distributorId"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_owner_scope_round_trips_through_filter() {
        let owner = Uuid::new_v4();
        let filter = Filter::by_id(Uuid::new_v4(), &PRODUCT_FILTERS, Scope::Owner(owner));
        assert_eq!(filter.owner_scope(), Scope::Owner(owner));

        let filter = Filter::by_id(Uuid::new_v4(), &PRODUCT_FILTERS, Scope::Global);
        assert_eq!(filter.owner_scope(), Scope::Global);
    }

    #[test]
    fn test_owner_scope_is_appended_last() {
        let owner = Uuid::new_v4();
        let filter = build_filter(
            &params(&[("category", "Cabos")]),
            &PRODUCT_FILTERS,
            Scope::Owner(owner),
        )
        .unwrap();
        assert_eq!(
            filter.predicates().last(),
            Some(&Predicate::OwnedBy {
                column: "created_by",
                user_id: owner
            })
        );
        assert_eq!(
            render(&filter),
            "SELECT * FROM products WHERE category = $1 AND created_by = $2"
        );
    }

    #[test]
    fn test_unowned_entities_ignore_scope() {
        let config = FilterConfig {
            owner_column: None,
            ..PRODUCT_FILTERS
        };
        let filter = build_filter(&HashMap::new(), &config, Scope::Owner(Uuid::new_v4())).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive_of_whole_days() {
        let filter = build_filter(
            &params(&[("dateFrom", "2024-03-01"), ("dateTo", "2024-03-31")]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap();

        let expected_from = parse_date("2024-03-01T00:00:00Z", false);
        let expected_to = parse_date("2024-03-31T23:59:59.999999Z", false);
        assert_eq!(
            filter.predicates(),
            &[Predicate::Range {
                column: "created_at",
                from: expected_from,
                to: expected_to,
            }]
        );
        assert_eq!(
            render(&filter),
            "SELECT * FROM products WHERE (TRUE AND created_at >= $1 AND created_at <= $2)"
        );
    }

    #[test]
    fn test_open_ended_date_range() {
        let filter = build_filter(
            &params(&[("dateTo", "2024-03-31T12:00:00-03:00")]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap();
        assert_eq!(
            filter.predicates(),
            &[Predicate::Range {
                column: "created_at",
                from: None,
                to: parse_date("2024-03-31T15:00:00Z", false),
            }]
        );
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let err = build_filter(&params(&[("dateFrom", "31/03/2024")]), &PRODUCT_FILTERS, Scope::Global)
            .unwrap_err();
        match err {
            ApiError::Validation { errors } => assert_eq!(errors[0].field, "dateFrom"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let err = build_filter(
            &params(&[("dateFrom", "2024-04-01"), ("dateTo", "2024-03-01")]),
            &PRODUCT_FILTERS,
            Scope::Global,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[test]
    fn test_by_id_respects_scope() {
        let id = Uuid::new_v4();
        let filter = Filter::by_id(id, &PRODUCT_FILTERS, Scope::Owner(Uuid::new_v4()));
        assert_eq!(
            render(&filter),
            "SELECT * FROM products WHERE id = $1 AND created_by = $2"
        );

        let filter = Filter::by_id(id, &PRODUCT_FILTERS, Scope::Global);
        assert_eq!(render(&filter), "SELECT * FROM products WHERE id = $1");
    }

    #[test]
    fn test_sort_defaults_and_whitelist() {
        let sort = build_sort(&HashMap::new(), &PRODUCT_FILTERS).unwrap();
        assert_eq!(
            sort,
            Sort {
                column: "created_at",
                direction: SortDirection::Desc
            }
        );

        let sort = build_sort(&params(&[("sortBy", "price"), ("sortOrder", "ASC")]), &PRODUCT_FILTERS)
            .unwrap();
        assert_eq!(
            sort,
            Sort {
                column: "price",
                direction: SortDirection::Asc
            }
        );

        assert!(build_sort(&params(&[("sortBy", "password_hash")]), &PRODUCT_FILTERS).is_err());
        assert!(build_sort(&params(&[("sortOrder", "sideways")]), &PRODUCT_FILTERS).is_err());
    }

    #[test]
    fn test_order_and_window_rendering() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_order_by(
            &mut query,
            Sort {
                column: "created_at",
                direction: SortDirection::Desc,
            },
        );
        push_limit_offset(&mut query, Pagination { page: 2, limit: 10 });
        assert_eq!(
            query.sql(),
            "SELECT * FROM products ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
    }
}
