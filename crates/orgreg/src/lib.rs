//! orgreg - Telegram bot that registers an organization's name, address and
//! contact number
//!
//! # Module Structure
//!
//! - `telegram`: bot construction, update decoding, reply gateway, dispatcher schema
//! - `web_server`: webhook HTTP endpoint
//! - `cli`: command-line interface
//!
//! The form itself lives in `orgreg-core`.

pub mod cli;
pub mod telegram;
pub mod web_server;

// Re-export commonly used types for convenience
pub use telegram::{create_bot, schema, HandlerDeps, TelegramGateway};
pub use web_server::{create_webhook_router, start_web_server};
