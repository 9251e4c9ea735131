use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    auth::AdminClaims,
    db::DatabasePoolHealth,
    errors::ApiError,
    models::ApiResponse,
    seed,
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status))
        .route("/reconnect", post(reconnect))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pool: DatabasePoolHealth,
}

/// Reports pool counters and whether a live query succeeds. Always 200 so
/// operators can read the state of a broken database.
#[utoipa::path(
    get,
    path = "/api/admin/database/status",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pool state and ping result", body = DatabaseStatus),
        (status = 403, description = "Admin role required")
    )
)]
async fn status(
    AdminClaims(_claims): AdminClaims,
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<DatabaseStatus>> {
    let ping = state.db.ping().await;
    Json(ApiResponse::ok(DatabaseStatus {
        connected: ping.is_ok(),
        error: ping.err().map(|e| e.to_string()),
        pool: state.db.pool_health(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/database/reconnect",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "New pool connected, schema and seed users applied", body = DatabaseStatus),
        (status = 403, description = "Admin role required"),
        (status = 503, description = "Database still unreachable")
    )
)]
async fn reconnect(
    AdminClaims(claims): AdminClaims,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DatabaseStatus>>, ApiError> {
    tracing::info!("Database reconnect requested by {}", claims.email);

    let outcome = async {
        state.db.reconnect().await?;
        seed::prepare_database(&state.db, &state.config).await
    }
    .await;
    if let Err(e) = outcome {
        tracing::error!("Database reconnect failed: {:#}", e);
        return Err(ApiError::database_unavailable(format!("{:#}", e)));
    }

    Ok(Json(
        ApiResponse::ok(DatabaseStatus {
            connected: true,
            error: None,
            pool: state.db.pool_health(),
        })
        .with_message("Database reconnected"),
    ))
}
