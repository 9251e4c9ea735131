use async_trait::async_trait;

use super::{resource::UpdateBuilder, Database};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{CreateProduct, Product, UpdateProduct},
    query::{Filter, FilterConfig},
    resource::Resource,
};

const PRODUCT_COLUMNS: &str = "id, name, description, sku, category, price, cost_price, unit, \
                               is_active, created_by, created_at, updated_at";

#[async_trait]
impl Resource for Product {
    type Create = CreateProduct;
    type Update = UpdateProduct;

    const NAME: &'static str = "Product";
    const TABLE: &'static str = "products";
    const COLUMNS: &'static str = PRODUCT_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["name", "description", "sku"],
        exact: &[("category", "category"), ("sku", "sku")],
        references: &[],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: Some("created_by"),
        sortable: &[
            ("name", "name"),
            ("price", "price"),
            ("category", "category"),
            ("createdAt", "created_at"),
            ("updatedAt", "updated_at"),
        ],
        default_sort: "created_at",
    };

    async fn insert(db: &Database, owner: &AuthUser, input: CreateProduct) -> Result<Self, ApiError> {
        let sql = format!(
            "INSERT INTO products (name, description, sku, category, price, cost_price, unit, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(input.name.trim())
            .bind(input.description)
            .bind(input.sku)
            .bind(input.category.trim())
            .bind(input.price)
            .bind(input.cost_price)
            .bind(input.unit)
            .bind(input.is_active.unwrap_or(true))
            .bind(owner.id)
            .fetch_one(&db.pool())
            .await?;

        Ok(product)
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdateProduct) -> Result<Option<Self>, ApiError> {
        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("name", patch.name.map(|n| n.trim().to_string()))
            .set("description", patch.description)
            .set("sku", patch.sku)
            .set("category", patch.category.map(|c| c.trim().to_string()))
            .set("price", patch.price)
            .set("cost_price", patch.cost_price)
            .set("unit", patch.unit)
            .set("is_active", patch.is_active);
        update.fetch(db, filter).await
    }
}
