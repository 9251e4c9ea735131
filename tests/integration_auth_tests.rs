use axum::http::{Method, StatusCode};
use serde_json::json;

use salescrm::test_utils::{TestConfigBuilder, TestContext, TEST_ADMIN_EMAIL, TEST_PASSWORD};

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ana", "email": "Ana@Example.com", "password": TEST_PASSWORD, "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "seller");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = ctx.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ana@example.com");
}

#[tokio::test]
async fn test_wrong_password_and_duplicate_email() {
    let ctx = TestContext::new().await;
    let payload = json!({ "name": "Bruno", "email": "bruno@example.com", "password": TEST_PASSWORD });
    ctx.request(Method::POST, "/api/auth/register", None, Some(payload.clone()))
        .await;

    let (status, body) = ctx
        .request(Method::POST, "/api/auth/register", None, Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DUPLICATE_KEY");

    let (status, _) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "bruno@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_are_admin_only() {
    let ctx = TestContext::new().await;
    let (_, seller) = ctx.seller("Carla").await;
    let (_, admin) = ctx.admin().await;

    let (status, _) = ctx.request(Method::GET, "/api/users", Some(&seller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.request(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    let id = ctx
        .create(
            &admin,
            "/api/users",
            json!({ "name": "Gerente", "email": "gerente@example.com", "password": TEST_PASSWORD, "role": "manager" }),
        )
        .await;
    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/api/users/{}", id),
            Some(&admin),
            Some(json!({ "isActive": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);
    assert_eq!(body["data"]["role"], "manager");

    let (status, _) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "gerente@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_fallback_creates_records_as_temporary_admin() {
    let ctx = TestContext::with_config(TestConfigBuilder::default().with_anonymous_fallback(true)).await;

    let (status, body) = ctx
        .request(Method::POST, "/api/clients", None, Some(json!({ "name": "Mercado Sol" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["data"]["createdBy"],
        salescrm::auth::TEMPORARY_ADMIN_ID.to_string()
    );

    let (status, body) = ctx.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], salescrm::auth::TEMPORARY_ADMIN_ID.to_string());
    assert_eq!(body["message"], "Signed in as the anonymous fallback identity");
}

#[tokio::test]
async fn test_reconnect_restores_schema_and_seeds_admin() {
    let ctx = TestContext::with_config(TestConfigBuilder::default().with_admin_password(TEST_PASSWORD)).await;
    let (_, admin_token) = ctx.admin().await;

    // Simulate a server that came up after startup without the schema.
    sqlx::query("DROP SCHEMA public CASCADE")
        .execute(&ctx.state.db.pool())
        .await
        .unwrap();
    sqlx::query("CREATE SCHEMA public")
        .execute(&ctx.state.db.pool())
        .await
        .unwrap();

    let (status, body) = ctx.request(Method::GET, "/api/clients", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", body);
    assert_eq!(body["error"], "DATABASE_UNAVAILABLE");

    let (status, body) = ctx
        .request(Method::POST, "/api/admin/database/reconnect", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["connected"], true);

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": TEST_ADMIN_EMAIL, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["user"]["role"], "admin");
    let seeded_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = ctx.request(Method::GET, "/api/clients", Some(&seeded_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);
}
