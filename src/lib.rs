pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod query;
pub mod resource;
pub mod routes;
pub mod seed;
pub mod swagger;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


use axum::{http::HeaderValue, middleware, Json, Router};
use config::Config;
use db::Database;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

/// Health check endpoint for monitoring
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running")
    )
)]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"success": true, "status": "ok"}))
}

/// Full application: `/api` routes, API docs, error-detail middleware,
/// tracing and CORS.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", routes::api_router())
        .merge(swagger::create_swagger_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            errors::expose_internal_details,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    use axum::http::{header, Method};

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}
