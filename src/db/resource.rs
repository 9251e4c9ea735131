use sqlx::{Encode, Postgres, QueryBuilder, Type};
use uuid::Uuid;

use super::Database;
use crate::{
    errors::ApiError,
    query::{push_limit_offset, push_order_by, Filter, Pagination, Sort},
    resource::Resource,
};

impl Database {
    pub async fn list_records<R: Resource>(
        &self,
        filter: &Filter,
        sort: Sort,
        pagination: Pagination,
    ) -> Result<Vec<R>, ApiError> {
        let mut query = select::<R>(filter);
        push_order_by(&mut query, sort);
        push_limit_offset(&mut query, pagination);

        let records = query.build_query_as::<R>().fetch_all(&self.pool()).await?;
        Ok(records)
    }

    /// Every matching row, unpaginated.
    pub async fn list_all_records<R: Resource>(
        &self,
        filter: &Filter,
        sort: Sort,
    ) -> Result<Vec<R>, ApiError> {
        let mut query = select::<R>(filter);
        push_order_by(&mut query, sort);

        let records = query.build_query_as::<R>().fetch_all(&self.pool()).await?;
        Ok(records)
    }

    pub async fn count_records<R: Resource>(&self, filter: &Filter) -> Result<i64, ApiError> {
        self.count_rows(R::TABLE, filter).await
    }

    pub async fn count_rows(&self, table: &str, filter: &Filter) -> Result<i64, ApiError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        query.push(table);
        filter.push_where(&mut query);

        let total: i64 = query.build_query_scalar().fetch_one(&self.pool()).await?;
        Ok(total)
    }

    pub async fn find_record<R: Resource>(&self, filter: &Filter) -> Result<Option<R>, ApiError> {
        let mut query = select::<R>(filter);
        query.push(" LIMIT 1");

        let record = query.build_query_as::<R>().fetch_optional(&self.pool()).await?;
        Ok(record)
    }

    /// Hard delete. Returns the id of the removed row, if any.
    pub async fn delete_record<R: Resource>(&self, filter: &Filter) -> Result<Option<Uuid>, ApiError> {
        let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ");
        query.push(R::TABLE);
        filter.push_where(&mut query);
        query.push(" RETURNING id");

        let id: Option<Uuid> = query
            .build_query_scalar()
            .fetch_optional(&self.pool())
            .await?;
        Ok(id)
    }
}

fn select<R: Resource>(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT ");
    query.push(R::COLUMNS);
    query.push(" FROM ");
    query.push(R::TABLE);
    filter.push_where(&mut query);
    query
}

/// `UPDATE <table> SET updated_at = NOW()` followed by one assignment per
/// provided field. Starting with `updated_at` keeps the statement valid when
/// the patch is empty.
pub struct UpdateBuilder {
    query: QueryBuilder<'static, Postgres>,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        let mut query = QueryBuilder::new("UPDATE ");
        query.push(table);
        query.push(" SET updated_at = NOW()");
        Self { query }
    }

    pub fn set<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'static + Encode<'static, Postgres> + Type<Postgres>,
    {
        if let Some(value) = value {
            self.query.push(", ");
            self.query.push(column);
            self.query.push(" = ");
            self.query.push_bind(value);
        }
        self
    }

    pub async fn fetch<R: Resource>(
        mut self,
        db: &Database,
        filter: &Filter,
    ) -> Result<Option<R>, ApiError> {
        filter.push_where(&mut self.query);
        self.query.push(" RETURNING ");
        self.query.push(R::COLUMNS);

        let record = self
            .query
            .build_query_as::<R>()
            .fetch_optional(&db.pool())
            .await?;
        Ok(record)
    }
}
