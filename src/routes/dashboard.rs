use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{ApiResponse, DashboardStats},
    query::Scope,
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(stats))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Counts and totals visible to the caller", body = DashboardStats),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Database unavailable")
    )
)]
async fn stats(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state.db.dashboard_stats(Scope::for_user(&user)).await?;
    Ok(Json(ApiResponse::ok(stats)))
}
