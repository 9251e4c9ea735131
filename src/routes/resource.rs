//! Generic CRUD endpoints for any [`Resource`].

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::ApiResponse,
    query::{build_filter, build_sort, Filter, Pagination, PaginationMeta, Scope},
    resource::Resource,
    validation::Validate,
    AppState,
};

pub fn router<R: Resource>() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/{id}", get(fetch::<R>).put(update::<R>).delete(remove::<R>))
}

/// Checks the role requirement and returns the visibility scope.
pub(crate) fn authorize<R: Resource>(user: &AuthUser) -> Result<Scope, ApiError> {
    if R::ADMIN_ONLY {
        user.require_admin()?;
        return Ok(Scope::Global);
    }
    Ok(Scope::for_user(user))
}

/// Records who changed what. Writes made by the anonymous fallback identity
/// are logged at warn so they stand out.
fn log_write<R: Resource>(user: &AuthUser, action: &str, id: Option<Uuid>) {
    let target = id.map(|id| format!(" {}", id)).unwrap_or_default();
    if user.is_fallback {
        tracing::warn!("{}{} {} by the anonymous fallback identity", R::NAME, target, action);
    } else {
        tracing::info!("{}{} {} by {}", R::NAME, target, action, user.id);
    }
}

async fn list<R: Resource>(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<R>>>, ApiError> {
    let scope = authorize::<R>(&user)?;
    let filter = build_filter(&params, &R::FILTERS, scope)?;
    let sort = build_sort(&params, &R::FILTERS)?;
    let pagination = Pagination::from_params(&params);

    let total = state.db.count_records::<R>(&filter).await?;
    let mut records = state.db.list_records::<R>(&filter, sort, pagination).await?;
    R::populate(&state.db, &mut records).await?;

    Ok(Json(ApiResponse::paginated(
        records,
        PaginationMeta::new(pagination, total),
    )))
}

async fn fetch<R: Resource>(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<R>>, ApiError> {
    let scope = authorize::<R>(&user)?;
    let mut record = state
        .db
        .find_record::<R>(&Filter::by_id(id, &R::FILTERS, scope))
        .await?
        .ok_or_else(|| ApiError::not_found(R::NAME))?;
    R::populate(&state.db, std::slice::from_mut(&mut record)).await?;

    Ok(Json(ApiResponse::ok(record)))
}

async fn create<R: Resource>(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<R::Create>,
) -> Result<(StatusCode, Json<ApiResponse<R>>), ApiError> {
    authorize::<R>(&user)?;
    input.validate()?;

    let mut record = R::insert(&state.db, &user, input).await?;
    log_write::<R>(&user, "created", None);
    R::populate(&state.db, std::slice::from_mut(&mut record)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(record).with_message(format!("{} created", R::NAME))),
    ))
}

async fn update<R: Resource>(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<R::Update>,
) -> Result<Json<ApiResponse<R>>, ApiError> {
    let scope = authorize::<R>(&user)?;
    patch.validate()?;

    let mut record = R::update(&state.db, &Filter::by_id(id, &R::FILTERS, scope), patch)
        .await?
        .ok_or_else(|| ApiError::not_found(R::NAME))?;
    log_write::<R>(&user, "updated", Some(id));
    R::populate(&state.db, std::slice::from_mut(&mut record)).await?;

    Ok(Json(
        ApiResponse::ok(record).with_message(format!("{} updated", R::NAME)),
    ))
}

async fn remove<R: Resource>(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let scope = authorize::<R>(&user)?;
    let deleted = state
        .db
        .delete_record::<R>(&Filter::by_id(id, &R::FILTERS, scope))
        .await?
        .ok_or_else(|| ApiError::not_found(R::NAME))?;

    log_write::<R>(&user, "deleted", Some(deleted));
    Ok(Json(
        ApiResponse::ok(json!({ "id": deleted })).with_message(format!("{} deleted", R::NAME)),
    ))
}
