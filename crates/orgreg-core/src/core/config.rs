use once_cell::sync::Lazy;
use secrecy::SecretString;
use std::env;

use crate::core::error::{AppError, AppResult};

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: users.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "users.db".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: orgreg.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "orgreg.log".to_string()));

/// Public base URL Telegram should deliver webhook updates to
/// Read from WEBHOOK_URL environment variable
/// The bot appends its token as the final path segment.
pub static WEBHOOK_URL: Lazy<Option<String>> =
    Lazy::new(|| env::var("WEBHOOK_URL").ok().filter(|url| !url.trim().is_empty()));

/// Custom Bot API server URL (local telegram-bot-api)
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> =
    Lazy::new(|| env::var("BOT_API_URL").ok().filter(|url| !url.trim().is_empty()));

/// Port the webhook HTTP server listens on
/// Read from PORT environment variable
/// Default: 8080
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(network::DEFAULT_PORT)
});

/// Reads the bot token from BOT_TOKEN (or TELOXIDE_TOKEN).
///
/// The token is not cached: startup calls this once and fails fast when it is
/// missing, so the process never begins serving without credentials.
pub fn bot_token() -> AppResult<SecretString> {
    token_from(env::var("BOT_TOKEN").ok(), env::var("TELOXIDE_TOKEN").ok())
}

fn token_from(primary: Option<String>, fallback: Option<String>) -> AppResult<SecretString> {
    primary
        .into_iter()
        .chain(fallback)
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| AppError::Config("BOT_TOKEN (or TELOXIDE_TOKEN) is not set".to_string()))
}

/// Network configuration
pub mod network {
    use std::time::Duration;

    /// Default webhook listen port
    pub const DEFAULT_PORT: u16 = 8080;

    /// Request timeout for Bot API calls (in seconds)
    /// Must exceed the long-polling timeout teloxide asks Telegram for.
    pub const TIMEOUT_SECS: u64 = 60;

    /// Bot API request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Database configuration
pub mod database {
    use std::time::Duration;

    /// Maximum connections kept in the pool
    pub const POOL_SIZE: u32 = 10;

    /// How long SQLite waits on a locked database before failing a statement
    pub const BUSY_TIMEOUT_SECS: u64 = 30;

    /// SQLite busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn missing_token_is_a_config_error() {
        let err = token_from(None, None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn blank_token_is_treated_as_missing() {
        assert!(token_from(Some("   ".into()), None).is_err());
    }

    #[test]
    fn falls_back_to_teloxide_token() {
        let token = token_from(Some(String::new()), Some("123:abc".into())).unwrap();
        assert_eq!(token.expose_secret(), "123:abc");
    }

    #[test]
    fn bot_token_wins_over_fallback() {
        let token = token_from(Some(" 1:a ".into()), Some("2:b".into())).unwrap();
        assert_eq!(token.expose_secret(), "1:a");
    }
}
