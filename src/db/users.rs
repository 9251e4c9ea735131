use async_trait::async_trait;
use uuid::Uuid;

use super::{resource::UpdateBuilder, Database};
use crate::{
    auth::{hash_password, AuthUser},
    errors::ApiError,
    models::{CreateUser, UpdateUser, User, UserRole},
    query::{Filter, FilterConfig},
    resource::Resource,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_active, created_by, created_at, updated_at";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Database {
    pub async fn create_user(
        &self,
        user: CreateUser,
        created_by: Option<Uuid>,
    ) -> Result<User, ApiError> {
        let password_hash = hash_password(&user.password)?;
        let role = user.role.unwrap_or(UserRole::Seller);

        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.name.trim())
            .bind(normalize_email(&user.email))
            .bind(&password_hash)
            .bind(role.to_string())
            .bind(created_by)
            .fetch_one(&self.pool())
            .await?;

        Ok(created)
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool())
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool())
            .await
    }

    /// Inserts a user with a fixed id unless it already exists.
    pub async fn ensure_user(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(role.to_string())
        .execute(&self.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Resource for User {
    type Create = CreateUser;
    type Update = UpdateUser;

    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = USER_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["name", "email"],
        exact: &[("role", "role")],
        references: &[],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: None,
        sortable: &[("name", "name"), ("email", "email"), ("createdAt", "created_at")],
        default_sort: "created_at",
    };
    const ADMIN_ONLY: bool = true;

    async fn insert(db: &Database, owner: &AuthUser, input: CreateUser) -> Result<Self, ApiError> {
        db.create_user(input, Some(owner.id)).await
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdateUser) -> Result<Option<Self>, ApiError> {
        let password_hash = patch.password.as_deref().map(hash_password).transpose()?;

        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("name", patch.name.map(|n| n.trim().to_string()))
            .set("email", patch.email.as_deref().map(normalize_email))
            .set("password_hash", password_hash)
            .set("role", patch.role.map(|r| r.to_string()))
            .set("is_active", patch.is_active);
        update.fetch(db, filter).await
    }
}
