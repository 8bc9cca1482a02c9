//! Telegram bot handler tree configuration
//!
//! The same schema drives the polling dispatcher in production and can be
//! handed to a test dispatcher.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use orgreg_core::{Conversation, ReplyGateway};

use super::gateway::{decode_message, TelegramGateway};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
pub struct HandlerDeps<G = TelegramGateway> {
    pub conversation: Arc<Conversation<G>>,
}

impl<G> Clone for HandlerDeps<G> {
    fn clone(&self) -> Self {
        Self {
            conversation: Arc::clone(&self.conversation),
        }
    }
}

impl<G> HandlerDeps<G> {
    /// Create new handler dependencies
    pub fn new(conversation: Arc<Conversation<G>>) -> Self {
        Self { conversation }
    }
}

/// Creates the main dispatcher schema for the Telegram bot.
pub fn schema<G>(deps: HandlerDeps<G>) -> UpdateHandler<HandlerError>
where
    G: ReplyGateway + 'static,
{
    dptree::entry().branch(message_handler(deps))
}

/// Handler for text messages (/start, /reset and form answers)
fn message_handler<G>(deps: HandlerDeps<G>) -> UpdateHandler<HandlerError>
where
    G: ReplyGateway + 'static,
{
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(update) = decode_message(&msg) else {
                    log::debug!("Ignoring message {} in chat {}", msg.id.0, msg.chat.id.0);
                    return Ok::<(), HandlerError>(());
                };

                let subscriber_id = update.subscriber_id;
                match deps.conversation.handle(update).await {
                    Ok(outcome) => log::debug!("Message from {}: {:?}", subscriber_id, outcome),
                    // No reply is sent for a failed update
                    Err(e) => log::error!("Failed to handle message from {}: {}", subscriber_id, e),
                }
                Ok::<(), HandlerError>(())
            }
        })
}
