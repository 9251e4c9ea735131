use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::AppState;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error taxonomy shared by every handler. Each variant maps to exactly one
/// HTTP status and is rendered as the `{ success: false, ... }` envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation { errors: Vec<FieldError> },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Duplicate key: {message}")]
    DuplicateKey { message: String },

    #[error("Authentication required: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Database unavailable: {message}")]
    DatabaseUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Technical detail of a 500, carried as a response extension so the
/// [`expose_internal_details`] middleware can decide whether to render it.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl ApiError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self::Validation { errors }
    }

    pub fn invalid_field<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn duplicate_key<S: Into<String>>(message: S) -> Self {
        Self::DuplicateKey { message: message.into() }
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn database_unavailable<S: Into<String>>(message: S) -> Self {
        Self::DatabaseUnavailable { message: message.into() }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::DuplicateKey { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::DatabaseUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::DuplicateKey { .. } => "DUPLICATE_KEY",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::DatabaseUnavailable { .. } => "DATABASE_UNAVAILABLE",
            ApiError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to show to any caller.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation { .. } => "Validation failed".to_string(),
            ApiError::BadRequest { message } => message.clone(),
            ApiError::NotFound { resource } => format!("{} not found", resource),
            ApiError::DuplicateKey { message } => message.clone(),
            ApiError::Unauthorized { message } => message.clone(),
            ApiError::Forbidden { message } => message.clone(),
            ApiError::DatabaseUnavailable { .. } => {
                "Database is currently unavailable".to_string()
            }
            ApiError::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Internal { message } => {
                tracing::error!("Unhandled error: {}", message);
            }
            ApiError::DatabaseUnavailable { message } => {
                tracing::warn!("Database unavailable: {}", message);
            }
            _ => tracing::debug!("Request failed with {}: {}", status, self),
        }

        let mut body = json!({
            "success": false,
            "error": self.error_code(),
            "message": self.user_message(),
        });
        if let ApiError::Validation { errors } = &self {
            body["errors"] = json!(errors);
        }

        let mut response = (status, Json(body)).into_response();
        if let ApiError::Internal { message } = self {
            response
                .extensions_mut()
                .insert(InternalErrorDetail(message));
        }
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record"),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => ApiError::database_unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::duplicate_key(
                    db_err
                        .constraint()
                        .map(|c| format!("A record violating '{}' already exists", c))
                        .unwrap_or_else(|| "Record already exists".to_string()),
                ),
                Some("23514") | Some("23502") => ApiError::bad_request(db_err.message().to_string()),
                Some(code) if code.starts_with("22") => {
                    ApiError::bad_request(db_err.message().to_string())
                }
                Some(code) if code.starts_with("08") || code.starts_with("57P") => {
                    ApiError::database_unavailable(err.to_string())
                }
                // undefined_table: the server is up but the schema was never applied
                Some("42P01") => ApiError::database_unavailable(format!(
                    "database schema is not initialized: {}",
                    db_err.message()
                )),
                _ => ApiError::internal(err.to_string()),
            },
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<sqlx::Error>() {
            Ok(sqlx_err) => sqlx_err.into(),
            Err(other) => ApiError::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// Adds the technical detail of 500 responses to the body outside production.
pub async fn expose_internal_details(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if state.config.is_production() {
        return response;
    }

    let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    let body = json!({
        "success": false,
        "error": "INTERNAL_SERVER_ERROR",
        "message": "Internal server error",
        "details": detail,
    });
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::invalid_field("name", "required").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::duplicate_key("dup").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("Product").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::unauthorized("no token").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::database_unavailable("down").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::internal("boom").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pool_errors_map_to_unavailable() {
        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, ApiError::DatabaseUnavailable { .. }));

        let err: ApiError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, ApiError::DatabaseUnavailable { .. }));
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[derive(Debug)]
    struct PgError(&'static str);

    impl std::fmt::Display for PgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error returned from database: {}", self.0)
        }
    }

    impl std::error::Error for PgError {}

    impl sqlx::error::DatabaseError for PgError {
        fn message(&self) -> &str {
            "relation does not exist"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    #[test]
    fn test_missing_schema_maps_to_unavailable() {
        let err: ApiError = sqlx::Error::Database(Box::new(PgError("42P01"))).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = sqlx::Error::Database(Box::new(PgError("23505"))).into();
        assert!(matches!(err, ApiError::DuplicateKey { .. }));

        let err: ApiError = sqlx::Error::Database(Box::new(PgError("42703"))).into();
        assert!(matches!(err, ApiError::Internal { .. }));
    }

    #[test]
    fn test_anyhow_unwraps_sqlx_errors() {
        let err: ApiError = anyhow::Error::from(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, ApiError::DatabaseUnavailable { .. }));

        let err: ApiError = anyhow::anyhow!("something else").into();
        assert!(matches!(err, ApiError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_fields() {
        let response = ApiError::validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("price", "Price must be non-negative"),
        ])
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["errors"][0]["field"], "name");
        assert_eq!(body["errors"][1]["field"], "price");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail_in_body() {
        let response = ApiError::internal("connection string leaked").into_response();
        assert!(response.extensions().get::<InternalErrorDetail>().is_some());

        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("details").is_none());
    }
}
