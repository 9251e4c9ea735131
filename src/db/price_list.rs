use async_trait::async_trait;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

use super::{populate::ReferenceKind, resource::UpdateBuilder, Database};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{CreatePriceListItem, DistributorPriceList, PriceListItem, UpdatePriceListItem},
    query::{Filter, FilterConfig, Scope, Sort},
    resource::Resource,
};

const PRICE_LIST_COLUMNS: &str = "id, distributor_id, product_id, price, promotional_price, pricing_tiers, \
                                  valid_from, valid_until, notes, is_active, created_by, created_at, updated_at";

const DUPLICATE_MESSAGE: &str = "A price for this product and distributor already exists";

impl Database {
    /// Whether `owner` already priced `product_id` for `distributor_id`,
    /// ignoring the row `except` when given.
    pub async fn price_list_item_exists(
        &self,
        distributor_id: Uuid,
        product_id: Uuid,
        owner: Uuid,
        except: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM price_list_items
                WHERE distributor_id = $1 AND product_id = $2 AND created_by = $3
                  AND ($4::uuid IS NULL OR id <> $4)
            )
            "#,
        )
        .bind(distributor_id)
        .bind(product_id)
        .bind(owner)
        .bind(except)
        .fetch_one(&self.pool())
        .await
    }

    /// Matching items grouped per distributor, ordered by distributor name.
    /// Items whose distributor or product no longer exists are left out.
    pub async fn grouped_price_list(
        &self,
        filter: &Filter,
        sort: Sort,
    ) -> Result<Vec<DistributorPriceList>, ApiError> {
        let mut items = self.list_all_records::<PriceListItem>(filter, sort).await?;
        PriceListItem::populate(self, &mut items).await?;
        Ok(group_by_distributor(items))
    }
}

pub fn group_by_distributor(items: Vec<PriceListItem>) -> Vec<DistributorPriceList> {
    let mut groups: HashMap<Uuid, DistributorPriceList> = HashMap::new();

    for item in items {
        let (Some(distributor), Some(_)) = (item.distributor.clone(), item.product.as_ref()) else {
            tracing::debug!("Skipping price list item {} with a dangling reference", item.id);
            continue;
        };
        let group = groups
            .entry(distributor.id)
            .or_insert_with(|| DistributorPriceList {
                distributor,
                item_count: 0,
                items: Vec::new(),
            });
        group.item_count += 1;
        group.items.push(item);
    }

    let mut groups: Vec<DistributorPriceList> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        a.distributor
            .name
            .to_lowercase()
            .cmp(&b.distributor.name.to_lowercase())
            .then(a.distributor.id.cmp(&b.distributor.id))
    });
    groups
}

#[async_trait]
impl Resource for PriceListItem {
    type Create = CreatePriceListItem;
    type Update = UpdatePriceListItem;

    const NAME: &'static str = "Price list item";
    const TABLE: &'static str = "price_list_items";
    const COLUMNS: &'static str = PRICE_LIST_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["notes"],
        exact: &[],
        references: &[("distributorId", "distributor_id"), ("productId", "product_id")],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: Some("created_by"),
        sortable: &[
            ("price", "price"),
            ("validFrom", "valid_from"),
            ("validUntil", "valid_until"),
            ("createdAt", "created_at"),
        ],
        default_sort: "created_at",
    };

    /// The uniqueness check and the insert are separate statements, so two
    /// concurrent creates for the same tuple can both succeed.
    async fn insert(db: &Database, owner: &AuthUser, input: CreatePriceListItem) -> Result<Self, ApiError> {
        let references = [
            (ReferenceKind::Distributor, "distributorId".to_string(), input.distributor_id),
            (ReferenceKind::Product, "productId".to_string(), input.product_id),
        ];
        db.ensure_references(Scope::for_user(owner), &references).await?;

        if db
            .price_list_item_exists(input.distributor_id, input.product_id, owner.id, None)
            .await?
        {
            return Err(ApiError::duplicate_key(DUPLICATE_MESSAGE));
        }

        let sql = format!(
            "INSERT INTO price_list_items (distributor_id, product_id, price, promotional_price, pricing_tiers, \
             valid_from, valid_until, notes, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            PRICE_LIST_COLUMNS
        );
        let item = sqlx::query_as::<_, PriceListItem>(&sql)
            .bind(input.distributor_id)
            .bind(input.product_id)
            .bind(input.price)
            .bind(input.promotional_price)
            .bind(Json(input.pricing_tiers))
            .bind(input.valid_from)
            .bind(input.valid_until)
            .bind(input.notes)
            .bind(input.is_active.unwrap_or(true))
            .bind(owner.id)
            .fetch_one(&db.pool())
            .await?;

        Ok(item)
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdatePriceListItem) -> Result<Option<Self>, ApiError> {
        let Some(existing) = db.find_record::<PriceListItem>(filter).await? else {
            return Ok(None);
        };

        let mut references = Vec::new();
        if let Some(id) = patch.distributor_id {
            references.push((ReferenceKind::Distributor, "distributorId".to_string(), id));
        }
        if let Some(id) = patch.product_id {
            references.push((ReferenceKind::Product, "productId".to_string(), id));
        }
        db.ensure_references(filter.owner_scope(), &references).await?;

        let distributor_id = patch.distributor_id.unwrap_or(existing.distributor_id);
        let product_id = patch.product_id.unwrap_or(existing.product_id);
        if (distributor_id, product_id) != (existing.distributor_id, existing.product_id)
            && db
                .price_list_item_exists(distributor_id, product_id, existing.created_by, Some(existing.id))
                .await?
        {
            return Err(ApiError::duplicate_key(DUPLICATE_MESSAGE));
        }

        // A one-sided patch of the validity window is checked against the stored bound.
        let valid_from = patch.valid_from.or(existing.valid_from);
        let valid_until = patch.valid_until.or(existing.valid_until);
        if let (Some(from), Some(until)) = (valid_from, valid_until) {
            if from >= until {
                return Err(ApiError::invalid_field(
                    "validUntil",
                    "validUntil must be later than validFrom",
                ));
            }
        }

        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("distributor_id", patch.distributor_id)
            .set("product_id", patch.product_id)
            .set("price", patch.price)
            .set("promotional_price", patch.promotional_price)
            .set("pricing_tiers", patch.pricing_tiers.map(Json))
            .set("valid_from", patch.valid_from)
            .set("valid_until", patch.valid_until)
            .set("notes", patch.notes)
            .set("is_active", patch.is_active);
        update
            .fetch(db, &Filter::by_id(existing.id, &Self::FILTERS, Scope::Global))
            .await
    }

    async fn populate(db: &Database, records: &mut [Self]) -> Result<(), ApiError> {
        let distributors = db
            .resolve_references(
                ReferenceKind::Distributor,
                records.iter().map(|i| i.distributor_id),
            )
            .await?;
        let products = db
            .resolve_references(ReferenceKind::Product, records.iter().map(|i| i.product_id))
            .await?;

        for item in records.iter_mut() {
            item.distributor = distributors.get(&item.distributor_id).cloned();
            item.product = products.get(&item.product_id).cloned();
        }
        Ok(())
    }
}
