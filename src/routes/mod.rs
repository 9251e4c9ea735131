use axum::{
    extract::{FromRequest, FromRequestParts},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::{
    errors::ApiError,
    models::{Client, Distributor, Product, Proposal, Sale, User},
    AppState,
};

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod price_list;
pub mod resource;

/// `axum::Json` whose rejections render as the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejections render as the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` whose rejections render as the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Every `/api` route.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(crate::health_check))
        .nest("/auth", auth::router())
        .nest("/clients", resource::router::<Client>())
        .nest("/products", resource::router::<Product>())
        .nest("/distributors", resource::router::<Distributor>())
        .nest("/sales", resource::router::<Sale>())
        .nest("/proposals", resource::router::<Proposal>())
        .nest("/price-list", price_list::router())
        .nest("/users", resource::router::<User>())
        .nest("/dashboard", dashboard::router())
        .nest("/admin/database", admin::router())
}
