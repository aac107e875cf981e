//! Database connection pool management.
//!
//! Persistence is optional: with no configured URL the service runs
//! cache-only, which `connect` reports as `None` rather than an error.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connects a pool for the configured database.
    ///
    /// Returns `Ok(None)` when no URL is configured.
    ///
    /// # Errors
    /// Returns an error if a URL is configured but the connection cannot be
    /// established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Option<Self>, sqlx::Error> {
        if config.url.trim().is_empty() {
            info!("No database URL configured, running cache-only");
            return Ok(None);
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        info!("Database connection pool established");

        Ok(Some(Self { pool }))
    }

    /// Returns a reference to the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs database migrations.
    ///
    /// # Errors
    /// Returns an error if migrations fail.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}
