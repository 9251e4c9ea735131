use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::ApiJson;
use crate::{
    auth::{create_jwt, verify_password, AuthUser},
    errors::ApiError,
    models::{ApiResponse, CreateUser, LoginRequest, LoginResponse, User, UserRole},
    validation::Validate,
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// Self-service sign-up. The requested role is ignored; new accounts are sellers.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User registered", body = LoginResponse),
        (status = 400, description = "Invalid user data or email already registered")
    )
)]
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(mut user_data): ApiJson<CreateUser>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    user_data.validate()?;
    user_data.role = Some(UserRole::Seller);

    if state.db.get_user_by_email(&user_data.email).await?.is_some() {
        return Err(ApiError::duplicate_key("Email is already registered"));
    }

    let user = state.db.create_user(user_data, None).await?;
    let token = issue_token(&state, &user)?;
    tracing::info!("User {} registered", user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(LoginResponse { token, user }).with_message("User registered")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(login_data): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = state
        .db
        .get_user_by_email(&login_data.email)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !verify_password(&login_data.password, &user.password_hash) {
        tracing::debug!("Failed login for {}", user.email);
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = issue_token(&state, &user)?;
    Ok(Json(ApiResponse::ok(LoginResponse { token, user })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token")
    )
)]
async fn me(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .db
        .get_user_by_id(auth_user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let response = ApiResponse::ok(user);
    if auth_user.is_fallback {
        return Ok(Json(response.with_message("Signed in as the anonymous fallback identity")));
    }
    Ok(Json(response))
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    Ok(create_jwt(
        user,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?)
}
