//! Telegram side of the conversation: update decoding and reply delivery

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, ReplyMarkup, UpdateKind};

use orgreg_core::form::{KeyboardHint, Reply};
use orgreg_core::{AppResult, InboundUpdate, ReplyGateway};

/// Reduces a Telegram message to an [`InboundUpdate`].
///
/// Only text messages from a user in a private chat take part in the form;
/// everything else yields `None`.
pub fn decode_message(msg: &Message) -> Option<InboundUpdate> {
    if !msg.chat.is_private() {
        return None;
    }
    let text = msg.text()?;
    let user = msg.from.as_ref()?;
    let subscriber_id = i64::try_from(user.id.0).ok()?;

    Some(InboundUpdate {
        handle: user.username.clone(),
        display_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
        language_code: user.language_code.clone(),
        ..InboundUpdate::new(subscriber_id, text)
    })
}

/// Reduces any Telegram update; non-message updates are ignored.
pub fn decode_update(update: &Update) -> Option<InboundUpdate> {
    match &update.kind {
        UpdateKind::Message(msg) => decode_message(msg),
        _ => None,
    }
}

/// Builds the Telegram markup for a keyboard hint.
pub fn reply_markup(hint: &KeyboardHint) -> Option<ReplyMarkup> {
    match hint {
        KeyboardHint::Unchanged => None,
        KeyboardHint::Offer(buttons) => {
            let row = buttons.iter().map(|b| KeyboardButton::new(b.clone())).collect::<Vec<_>>();
            Some(ReplyMarkup::Keyboard(KeyboardMarkup::new(vec![row]).resize_keyboard()))
        }
        KeyboardHint::Clear => Some(ReplyMarkup::kb_remove()),
    }
}

/// Sends form replies through the Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReplyGateway for TelegramGateway {
    async fn send_reply(&self, subscriber_id: i64, reply: &Reply) -> AppResult<()> {
        let request = self.bot.send_message(ChatId(subscriber_id), reply.text.clone());
        match reply_markup(&reply.keyboard) {
            Some(markup) => request.reply_markup(markup).await?,
            None => request.await?,
        };
        Ok(())
    }
}
