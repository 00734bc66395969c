//! Persistence for generated assets, rejection history, the generation
//! queue, asset configurations, the composite cache and the audit log.
//!
//! Two layers:
//! - [`repositories`]: zero-sized `*Repo` structs with `&PgPool` methods.
//! - [`store`]: the [`store::AssetStore`] trait the pipeline is written
//!   against, with a Postgres implementation delegating to the repos and an
//!   in-memory implementation for tests and local runs.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
