//! Bot initialization and command registration
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Per-language command menus

use reqwest::ClientBuilder;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use orgreg_core::config;
use orgreg_core::i18n;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "начать регистрацию или показать данные")]
    Start,
    #[command(description = "сбросить данные и заполнить заново")]
    Reset,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, HTTP client setup)
pub fn create_bot(token: &SecretString) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    let bot = if let Some(bot_api_url) = config::BOT_API_URL.as_deref() {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        bot.set_api_url(url)
    } else {
        bot
    };

    Ok(bot)
}

/// Command list for one language, in menu order.
pub fn localized_commands(lang_code: &str) -> Vec<BotCommand> {
    let lang = i18n::lang_from_code(lang_code);
    vec![
        BotCommand::new("start", i18n::t(&lang, "command-start")),
        BotCommand::new("reset", i18n::t(&lang, "command-reset")),
    ]
}

/// Sets up bot commands in Telegram UI
///
/// The default menu comes from [`Command`]; every supported language also
/// gets its own translated menu.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;

    for (code, _) in i18n::SUPPORTED_LANGS {
        bot.set_my_commands(localized_commands(code))
            .language_code(code.to_string())
            .await?;
    }

    Ok(())
}
