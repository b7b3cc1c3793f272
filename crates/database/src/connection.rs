use crate::error::DbError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Used when `DATABASE_URL` is not set. `mode=rwc` creates the file.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://folio.db?mode=rwc";

/// Opens the SQLite database named by `DATABASE_URL` (from the environment
/// or a `.env` file), falling back to [`DEFAULT_DATABASE_URL`].
pub async fn connect() -> Result<SqlitePool, DbError> {
    // A missing .env file is fine; the variable may come from the shell.
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    connect_to(&database_url).await
}

/// Opens a pool limited to a single connection.
///
/// Every write therefore goes through one connection at a time, and an
/// in-memory database (`sqlite::memory:`) lives as long as the pool.
pub async fn connect_to(database_url: &str) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DbError::ConnectionConfigError(format!("invalid DATABASE_URL: {e}")))?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::debug!(url = database_url, "Connected to the snapshot database.");
    Ok(pool)
}

/// Applies the embedded migrations so the schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
