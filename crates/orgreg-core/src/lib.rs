//! orgreg-core - registration form engine for the orgreg Telegram bot
//!
//! # Module Structure
//!
//! - `core`: configuration, errors and logging
//! - `storage`: SQLite pool, subscriber store and schema migrations
//! - `form`: form states, inbound classification, transitions and replies
//! - `conversation`: drives the form against the store and a reply gateway
//! - `i18n`: Fluent translations

pub mod conversation;
pub mod core;
pub mod form;
pub mod i18n;
pub mod storage;

// Re-export commonly used types for convenience
pub use conversation::{Conversation, InboundUpdate, Outcome, ReplyGateway};
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, SubscriberStore};
