//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the effective configuration

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already installed
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
///
/// Never prints the bot token.
pub fn log_startup_configuration(use_webhook: bool) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("DATABASE_PATH: {}", config::DATABASE_PATH.as_str());
    log::info!("LOG_FILE_PATH: {}", config::LOG_FILE_PATH.as_str());
    match config::BOT_API_URL.as_deref() {
        Some(url) => log::info!("BOT_API_URL: {}", url),
        None => log::info!("BOT_API_URL: default (api.telegram.org)"),
    }

    if use_webhook {
        log::info!("Transport: webhook on port {}", *config::WEB_PORT);
        match config::WEBHOOK_URL.as_deref() {
            Some(url) => log::info!("WEBHOOK_URL: {}", url),
            None => log::warn!("WEBHOOK_URL: not set, the webhook must be registered externally"),
        }
    } else {
        log::info!("Transport: long polling");
    }
}
