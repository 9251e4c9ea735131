use anyhow::Result;
use tracing::{info, warn};

use crate::auth::{TEMPORARY_ADMIN_EMAIL, TEMPORARY_ADMIN_ID, TEMPORARY_ADMIN_NAME};
use crate::config::Config;
use crate::db::Database;
use crate::models::{CreateUser, UserRole};

/// Applies migrations, then seeds the configured admin and, when the
/// anonymous fallback is on, the temporary admin. Runs at startup and after
/// every reconnect; each step is idempotent.
pub async fn prepare_database(db: &Database, config: &Config) -> Result<()> {
    db.migrate().await?;
    info!("SQLx migrations completed successfully");

    seed_admin_user(db, config).await?;
    if config.allow_anonymous_fallback {
        seed_temporary_admin(db).await?;
    }
    Ok(())
}

/// Creates the initial admin from `ADMIN_EMAIL`/`ADMIN_PASSWORD` if no user
/// with that email exists. Skipped when no password is configured.
pub async fn seed_admin_user(db: &Database, config: &Config) -> Result<()> {
    let Some(password) = config.admin_password.as_deref() else {
        info!("ADMIN_PASSWORD not set, skipping admin seeding");
        return Ok(());
    };

    if db.get_user_by_email(&config.admin_email).await?.is_some() {
        info!("Admin user {} already exists", config.admin_email);
        return Ok(());
    }

    let admin = CreateUser {
        name: "Administrator".to_string(),
        email: config.admin_email.clone(),
        password: password.to_string(),
        role: Some(UserRole::Admin),
    };

    match db.create_user(admin, None).await {
        Ok(user) => info!("Admin user created: {} ({})", user.email, user.id),
        Err(e) => warn!("Failed to create admin user: {}", e),
    }

    Ok(())
}

/// Inserts the row behind the anonymous-fallback identity so records it
/// creates have a valid owner. The stored hash matches no password.
pub async fn seed_temporary_admin(db: &Database) -> Result<()> {
    db.ensure_user(
        TEMPORARY_ADMIN_ID,
        TEMPORARY_ADMIN_NAME,
        TEMPORARY_ADMIN_EMAIL,
        "!",
        UserRole::Admin,
    )
    .await?;
    warn!("Anonymous fallback enabled: unauthenticated requests act as {}", TEMPORARY_ADMIN_EMAIL);
    Ok(())
}
