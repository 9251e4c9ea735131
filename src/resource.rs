//! Contract between an entity and the generic CRUD plumbing.
//!
//! An entity implements [`Resource`] once; `db::resource` provides the shared
//! list/count/find/delete queries and `routes::resource::router` turns the
//! implementation into the five REST endpoints.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow};

use crate::{
    auth::AuthUser,
    db::Database,
    errors::ApiError,
    query::{Filter, FilterConfig},
    validation::Validate,
};

#[async_trait]
pub trait Resource:
    for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static
{
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;

    /// Singular name used in messages, e.g. `"Client"`.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Column list for `SELECT` and `RETURNING`.
    const COLUMNS: &'static str;
    const FILTERS: FilterConfig;
    /// Restricts every endpoint to admins.
    const ADMIN_ONLY: bool = false;

    async fn insert(db: &Database, owner: &AuthUser, input: Self::Create) -> Result<Self, ApiError>;

    /// Applies the provided fields to the row matched by `filter`.
    /// `Ok(None)` when nothing matched.
    async fn update(db: &Database, filter: &Filter, patch: Self::Update)
        -> Result<Option<Self>, ApiError>;

    /// Attaches referenced records after a read.
    async fn populate(_db: &Database, _records: &mut [Self]) -> Result<(), ApiError> {
        Ok(())
    }
}
