//! Telegram bot integration and handlers

pub mod bot;
pub mod gateway;
pub mod handlers;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use gateway::{decode_message, decode_update, TelegramGateway};
pub use handlers::{schema, HandlerDeps, HandlerError};
