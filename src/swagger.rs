use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    db::DatabasePoolHealth,
    models::{
        CreateUser, DashboardStats, DistributorPriceList, LoginRequest, LoginResponse, PriceListItem,
        PricingTier, ProposalStatusCounts, Reference, User, UserRole,
    },
    routes::admin::DatabaseStatus,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health_check,
        // Auth endpoints
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        // Reporting
        crate::routes::dashboard::stats,
        crate::routes::price_list::grouped,
        // Database administration
        crate::routes::admin::status,
        crate::routes::admin::reconnect,
    ),
    components(
        schemas(
            CreateUser, LoginRequest, LoginResponse, User, UserRole,
            DashboardStats, ProposalStatusCounts,
            DistributorPriceList, PriceListItem, PricingTier, Reference,
            DatabaseStatus, DatabasePoolHealth
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Registration, login and the current user"),
        (name = "dashboard", description = "Aggregated sales figures"),
        (name = "price-list", description = "Distributor price lists"),
        (name = "admin", description = "Database status and reconnect"),
    ),
    info(
        title = "Sales CRM API",
        version = "0.1.0",
        description = "Clients, products, distributors, sales, proposals and price lists"
    )
)]
pub struct ApiDoc;

pub fn create_swagger_router() -> Router<Arc<AppState>> {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
