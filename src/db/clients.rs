use async_trait::async_trait;
use sqlx::types::Json;

use super::{resource::UpdateBuilder, Database};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{Client, CreateClient, UpdateClient},
    query::{Filter, FilterConfig},
    resource::Resource,
};

const CLIENT_COLUMNS: &str = "id, name, email, phone, company, document, address, notes, \
                              is_active, created_by, created_at, updated_at";

#[async_trait]
impl Resource for Client {
    type Create = CreateClient;
    type Update = UpdateClient;

    const NAME: &'static str = "Client";
    const TABLE: &'static str = "clients";
    const COLUMNS: &'static str = CLIENT_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["name", "email", "company", "document"],
        exact: &[("city", "address->>'city'"), ("uf", "address->>'uf'")],
        references: &[],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: Some("created_by"),
        sortable: &[
            ("name", "name"),
            ("company", "company"),
            ("createdAt", "created_at"),
            ("updatedAt", "updated_at"),
        ],
        default_sort: "created_at",
    };

    async fn insert(db: &Database, owner: &AuthUser, input: CreateClient) -> Result<Self, ApiError> {
        let sql = format!(
            "INSERT INTO clients (name, email, phone, company, document, address, notes, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            CLIENT_COLUMNS
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(input.name.trim())
            .bind(input.email.map(|e| e.trim().to_lowercase()))
            .bind(input.phone)
            .bind(input.company)
            .bind(input.document)
            .bind(Json(input.address.normalized()))
            .bind(input.notes)
            .bind(input.is_active.unwrap_or(true))
            .bind(owner.id)
            .fetch_one(&db.pool())
            .await?;

        Ok(client)
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdateClient) -> Result<Option<Self>, ApiError> {
        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("name", patch.name.map(|n| n.trim().to_string()))
            .set("email", patch.email.map(|e| e.trim().to_lowercase()))
            .set("phone", patch.phone)
            .set("company", patch.company)
            .set("document", patch.document)
            .set("address", patch.address.map(|a| Json(a.normalized())))
            .set("notes", patch.notes)
            .set("is_active", patch.is_active);
        update.fetch(db, filter).await
    }
}
