use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use super::{populate::ReferenceKind, resource::UpdateBuilder, Database};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{check_total, items_total, CreateSale, LineItem, Sale, UpdateSale},
    query::{Filter, FilterConfig, Scope},
    resource::Resource,
    validation::FieldErrors,
};

const SALE_COLUMNS: &str = "id, client_id, distributor_id, items, discount, total, status, \
                            payment_method, sale_date, notes, is_active, created_by, created_at, updated_at";

/// `(kind, field, id)` triples for the ids a sale or proposal points at.
pub(crate) fn line_references(
    client_id: Option<Uuid>,
    distributor_id: Option<Uuid>,
    items: Option<&[LineItem]>,
) -> Vec<(ReferenceKind, String, Uuid)> {
    let mut references = Vec::new();
    if let Some(id) = client_id {
        references.push((ReferenceKind::Client, "clientId".to_string(), id));
    }
    if let Some(id) = distributor_id {
        references.push((ReferenceKind::Distributor, "distributorId".to_string(), id));
    }
    for (index, item) in items.unwrap_or_default().iter().enumerate() {
        if let Some(id) = item.product_id {
            references.push((ReferenceKind::Product, format!("items[{}].productId", index), id));
        }
    }
    references
}

#[async_trait]
impl Resource for Sale {
    type Create = CreateSale;
    type Update = UpdateSale;

    const NAME: &'static str = "Sale";
    const TABLE: &'static str = "sales";
    const COLUMNS: &'static str = SALE_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["notes", "payment_method"],
        exact: &[
            ("status", "status"),
            ("paymentMethod", "payment_method"),
        ],
        references: &[("clientId", "client_id"), ("distributorId", "distributor_id")],
        flags: &[("isActive", "is_active")],
        date_column: Some("sale_date"),
        owner_column: Some("created_by"),
        sortable: &[
            ("saleDate", "sale_date"),
            ("total", "total"),
            ("status", "status"),
            ("createdAt", "created_at"),
        ],
        default_sort: "created_at",
    };

    async fn insert(db: &Database, owner: &AuthUser, input: CreateSale) -> Result<Self, ApiError> {
        let references = line_references(
            Some(input.client_id),
            input.distributor_id,
            Some(&input.items),
        );
        db.ensure_references(Scope::for_user(owner), &references).await?;

        let total = items_total(&input.items, input.discount);
        let sql = format!(
            "INSERT INTO sales (client_id, distributor_id, items, discount, total, status, payment_method, \
             sale_date, notes, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()), $9, $10, $11) RETURNING {}",
            SALE_COLUMNS
        );
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(input.client_id)
            .bind(input.distributor_id)
            .bind(Json(input.items))
            .bind(input.discount)
            .bind(total)
            .bind(input.status.to_string())
            .bind(input.payment_method)
            .bind(input.sale_date)
            .bind(input.notes)
            .bind(input.is_active.unwrap_or(true))
            .bind(owner.id)
            .fetch_one(&db.pool())
            .await?;

        Ok(sale)
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdateSale) -> Result<Option<Self>, ApiError> {
        let Some(existing) = db.find_record::<Sale>(filter).await? else {
            return Ok(None);
        };

        let references = line_references(
            patch.client_id,
            patch.distributor_id,
            patch.items.as_deref(),
        );
        db.ensure_references(filter.owner_scope(), &references).await?;

        let total = if patch.items.is_some() || patch.discount.is_some() {
            let items = patch.items.as_deref().unwrap_or(&existing.items.0);
            let discount = patch.discount.unwrap_or(existing.discount);
            let mut errors = FieldErrors::new();
            let total = check_total(&mut errors, items, discount);
            errors.finish()?;
            Some(total)
        } else {
            None
        };

        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("client_id", patch.client_id)
            .set("distributor_id", patch.distributor_id)
            .set("items", patch.items.map(Json))
            .set("discount", patch.discount)
            .set("total", total)
            .set("status", patch.status.map(|s| s.to_string()))
            .set("payment_method", patch.payment_method)
            .set("sale_date", patch.sale_date)
            .set("notes", patch.notes)
            .set("is_active", patch.is_active);
        update
            .fetch(db, &Filter::by_id(existing.id, &Self::FILTERS, Scope::Global))
            .await
    }

    async fn populate(db: &Database, records: &mut [Self]) -> Result<(), ApiError> {
        let clients = db
            .resolve_references(ReferenceKind::Client, records.iter().map(|s| s.client_id))
            .await?;
        let distributors = db
            .resolve_references(
                ReferenceKind::Distributor,
                records.iter().filter_map(|s| s.distributor_id),
            )
            .await?;

        for sale in records.iter_mut() {
            sale.client = clients.get(&sale.client_id).cloned();
            sale.distributor = sale.distributor_id.and_then(|id| distributors.get(&id).cloned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_references_names_fields() {
        let client = Uuid::new_v4();
        let product = Uuid::new_v4();
        let items = vec![
            LineItem {
                product_id: None,
                description: Some("Frete".to_string()),
                quantity: 1.0,
                unit_price: 20.0,
            },
            LineItem {
                product_id: Some(product),
                description: None,
                quantity: 2.0,
                unit_price: 150.0,
            },
        ];
        let references = line_references(Some(client), None, Some(&items));
        assert_eq!(
            references,
            vec![
                (ReferenceKind::Client, "clientId".to_string(), client),
                (ReferenceKind::Product, "items[1].productId".to_string(), product),
            ]
        );
    }
}
