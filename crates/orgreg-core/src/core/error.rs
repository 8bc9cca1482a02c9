use thiserror::Error;

/// Centralized error types for the application
///
/// Every fallible operation in the store, the conversation engine and the
/// transports is converted to this enum so the edges (polling handler,
/// webhook endpoint, `main`) can log and map it in one place.
///
/// # Example
///
/// ```no_run
/// use orgreg_core::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     log::error!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Versioned schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reply delivery failed for a reason other than the Telegram API
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Telegram API errors
    #[cfg(feature = "telegram")]
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
