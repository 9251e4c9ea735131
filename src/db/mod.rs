use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use utoipa::ToSchema;

pub mod clients;
pub mod dashboard;
pub mod distributors;
pub mod populate;
pub mod price_list;
pub mod products;
pub mod proposals;
pub mod resource;
pub mod sales;
pub mod users;

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl PoolSettings {
    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePoolHealth {
    pub size: u32,
    pub num_idle: usize,
    pub is_closed: bool,
}

/// Shared handle to the connection pool.
///
/// Clones share the same slot, so a pool swapped in by [`Database::reconnect`]
/// is seen by every handler.
#[derive(Clone)]
pub struct Database {
    pool: Arc<RwLock<PgPool>>,
    database_url: Arc<str>,
    settings: PoolSettings,
}

impl Database {
    /// Connects eagerly and fails if the server is unreachable.
    pub async fn new(database_url: &str, settings: PoolSettings) -> Result<Self> {
        let pool = settings.options().connect(database_url).await?;
        Ok(Self::from_pool(pool, database_url, settings))
    }

    /// Builds the pool without opening a connection. Queries fail with a pool
    /// timeout until the server becomes reachable.
    pub fn new_lazy(database_url: &str, settings: PoolSettings) -> Result<Self> {
        let pool = settings.options().connect_lazy(database_url)?;
        Ok(Self::from_pool(pool, database_url, settings))
    }

    pub fn from_pool(pool: PgPool, database_url: &str, settings: PoolSettings) -> Self {
        Self {
            pool: Arc::new(RwLock::new(pool)),
            database_url: Arc::from(database_url),
            settings,
        }
    }

    /// Current pool. `PgPool` is reference counted, so the clone is cheap and
    /// the lock is never held across an await point.
    pub fn pool(&self) -> PgPool {
        match self.pool.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool()).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool()).await?;
        Ok(())
    }

    pub fn pool_health(&self) -> DatabasePoolHealth {
        let pool = self.pool();
        DatabasePoolHealth {
            size: pool.size(),
            num_idle: pool.num_idle(),
            is_closed: pool.is_closed(),
        }
    }

    /// Opens a fresh pool, swaps it in and closes the old one. The current
    /// pool stays in place if the new one cannot connect. Schema and seed
    /// users are applied separately by [`crate::seed::prepare_database`].
    pub async fn reconnect(&self) -> Result<()> {
        let fresh = self.settings.options().connect(&self.database_url).await?;

        let old = {
            let mut guard = self
                .pool
                .write()
                .map_err(|_| anyhow!("database pool lock poisoned"))?;
            std::mem::replace(&mut *guard, fresh)
        };
        old.close().await;
        tracing::info!("Database pool replaced");
        Ok(())
    }
}
