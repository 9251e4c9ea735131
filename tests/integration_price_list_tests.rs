use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use salescrm::test_utils::TestContext;

async fn catalog(ctx: &TestContext, token: &str) -> (Uuid, Uuid) {
    let distributor = ctx
        .create(token, "/api/distributors", json!({ "name": "Distribuidora Norte" }))
        .await;
    let product = ctx
        .create(token, "/api/products", json!({ "name": "Router X", "price": 300, "category": "Equipamentos" }))
        .await;
    (distributor, product)
}

#[tokio::test]
async fn test_duplicate_price_is_rejected_without_new_row() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.seller("Ana").await;
    let (distributor, product) = catalog(&ctx, &token).await;

    let item = json!({ "distributorId": distributor, "productId": product, "price": 280 });
    ctx.create(&token, "/api/price-list", item.clone()).await;

    let (status, body) = ctx
        .request(Method::POST, "/api/price-list", Some(&token), Some(item))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DUPLICATE_KEY");

    let (_, body) = ctx.request(Method::GET, "/api/price-list", Some(&token), None).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_same_tuple_is_allowed_for_another_owner() {
    let ctx = TestContext::new().await;
    let (_, ana) = ctx.seller("Ana").await;
    let (_, admin) = ctx.admin().await;
    let (distributor, product) = catalog(&ctx, &ana).await;

    let item = json!({ "distributorId": distributor, "productId": product, "price": 280 });
    ctx.create(&ana, "/api/price-list", item.clone()).await;
    ctx.create(&admin, "/api/price-list", item).await;

    let (_, body) = ctx.request(Method::GET, "/api/price-list", Some(&admin), None).await;
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn test_sellers_cannot_price_another_sellers_catalog() {
    let ctx = TestContext::new().await;
    let (_, ana) = ctx.seller("Ana").await;
    let (_, bruno) = ctx.seller("Bruno").await;
    let (distributor, product) = catalog(&ctx, &ana).await;

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/price-list",
            Some(&bruno),
            Some(json!({ "distributorId": distributor, "productId": product, "price": 280 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_references_are_rejected() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.seller("Carla").await;

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/price-list",
            Some(&token),
            Some(json!({ "distributorId": Uuid::new_v4(), "productId": Uuid::new_v4(), "price": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_grouped_view_skips_dangling_references() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.seller("Diego").await;
    let (norte, router) = catalog(&ctx, &token).await;
    let alfa = ctx
        .create(&token, "/api/distributors", json!({ "name": "Alfa Atacado" }))
        .await;
    let switch = ctx
        .create(&token, "/api/products", json!({ "name": "Switch 8p", "price": 150, "category": "Equipamentos" }))
        .await;

    for (distributor, product) in [(norte, router), (norte, switch), (alfa, router)] {
        ctx.create(
            &token,
            "/api/price-list",
            json!({ "distributorId": distributor, "productId": product, "price": 100 }),
        )
        .await;
    }

    let (status, body) = ctx
        .request(Method::GET, "/api/price-list/grouped", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["data"][0]["distributor"]["name"], "Alfa Atacado");
    assert_eq!(body["data"][1]["itemCount"], 2);
    assert!(body["data"][1]["items"][0]["product"]["id"].is_string());

    let (status, _) = ctx
        .request(Method::DELETE, &format!("/api/products/{}", switch), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .request(Method::GET, "/api/price-list/grouped", Some(&token), None)
        .await;
    assert_eq!(body["data"][1]["itemCount"], 1);

    let (_, body) = ctx
        .request(Method::GET, "/api/price-list/grouped?limit=1&page=2", Some(&token), None)
        .await;
    assert_eq!(body["pagination"], json!({ "current": 2, "pages": 2, "total": 2, "limit": 1 }));
    assert_eq!(body["data"][0]["distributor"]["name"], "Distribuidora Norte");
}

#[tokio::test]
async fn test_validity_window_is_enforced_on_update() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.seller("Elisa").await;
    let (distributor, product) = catalog(&ctx, &token).await;

    let id = ctx
        .create(
            &token,
            "/api/price-list",
            json!({
                "distributorId": distributor,
                "productId": product,
                "price": 280,
                "validFrom": "2024-01-01T00:00:00Z",
                "validUntil": "2024-12-31T00:00:00Z"
            }),
        )
        .await;

    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/api/price-list/{}", id),
            Some(&token),
            Some(json!({ "validUntil": "2023-06-01T00:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "validUntil");
}
