use async_trait::async_trait;
use sqlx::types::Json;

use super::{resource::UpdateBuilder, Database};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{CreateDistributor, Distributor, UpdateDistributor},
    query::{Filter, FilterConfig},
    resource::Resource,
};

const DISTRIBUTOR_COLUMNS: &str = "id, name, trade_name, cnpj, contact, address, notes, \
                                   is_active, created_by, created_at, updated_at";

#[async_trait]
impl Resource for Distributor {
    type Create = CreateDistributor;
    type Update = UpdateDistributor;

    const NAME: &'static str = "Distributor";
    const TABLE: &'static str = "distributors";
    const COLUMNS: &'static str = DISTRIBUTOR_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["name", "trade_name", "cnpj", "contact->>'name'"],
        exact: &[("city", "address->>'city'"), ("uf", "address->>'uf'")],
        references: &[],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: Some("created_by"),
        sortable: &[
            ("name", "name"),
            ("tradeName", "trade_name"),
            ("createdAt", "created_at"),
            ("updatedAt", "updated_at"),
        ],
        default_sort: "created_at",
    };

    async fn insert(db: &Database, owner: &AuthUser, input: CreateDistributor) -> Result<Self, ApiError> {
        let sql = format!(
            "INSERT INTO distributors (name, trade_name, cnpj, contact, address, notes, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            DISTRIBUTOR_COLUMNS
        );
        let distributor = sqlx::query_as::<_, Distributor>(&sql)
            .bind(input.name.trim())
            .bind(input.trade_name)
            .bind(input.cnpj)
            .bind(Json(input.contact))
            .bind(Json(input.address.normalized()))
            .bind(input.notes)
            .bind(input.is_active.unwrap_or(true))
            .bind(owner.id)
            .fetch_one(&db.pool())
            .await?;

        Ok(distributor)
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdateDistributor) -> Result<Option<Self>, ApiError> {
        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("name", patch.name.map(|n| n.trim().to_string()))
            .set("trade_name", patch.trade_name)
            .set("cnpj", patch.cnpj)
            .set("contact", patch.contact.map(Json))
            .set("address", patch.address.map(|a| Json(a.normalized())))
            .set("notes", patch.notes)
            .set("is_active", patch.is_active);
        update.fetch(db, filter).await
    }
}
