use axum::{extract::State, response::Json, routing::get, Router};
use std::{collections::HashMap, sync::Arc};

use super::{resource, ApiQuery};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{ApiResponse, DistributorPriceList, PriceListItem},
    query::{build_filter, build_sort, pagination::paginate_slice, Pagination, PaginationMeta},
    resource::Resource,
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/grouped", get(grouped))
        .merge(resource::router::<PriceListItem>())
}

/// Price list grouped by distributor. Pagination applies to groups, not items.
#[utoipa::path(
    get,
    path = "/api/price-list/grouped",
    tag = "price-list",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("page" = Option<i64>, Query, description = "1-based group page"),
        ("limit" = Option<i64>, Query, description = "Groups per page, at most 100"),
        ("distributorId" = Option<String>, Query, description = "Only this distributor"),
        ("productId" = Option<String>, Query, description = "Only this product")
    ),
    responses(
        (status = 200, description = "Price list items grouped by distributor", body = [DistributorPriceList]),
        (status = 400, description = "Malformed filter")
    )
)]
async fn grouped(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<DistributorPriceList>>>, ApiError> {
    let scope = resource::authorize::<PriceListItem>(&user)?;
    let filter = build_filter(&params, &PriceListItem::FILTERS, scope)?;
    let sort = build_sort(&params, &PriceListItem::FILTERS)?;
    let pagination = Pagination::from_params(&params);

    let groups = state.db.grouped_price_list(&filter, sort).await?;
    let total = groups.len() as i64;

    Ok(Json(ApiResponse::paginated(
        paginate_slice(groups, pagination),
        PaginationMeta::new(pagination, total),
    )))
}
