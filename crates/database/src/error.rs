use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load the database configuration: {0}")]
    ConnectionConfigError(String),

    #[error("A database operation failed: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}
