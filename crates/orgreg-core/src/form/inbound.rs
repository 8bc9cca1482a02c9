/// Commands the registration form reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormCommand {
    Start,
    Reset,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(FormCommand),
    /// A `/command` the bot doesn't know; never used as form input.
    UnknownCommand(String),
    /// Free text with surrounding whitespace trimmed.
    Text(String),
}

impl Inbound {
    /// Classifies raw message text.
    ///
    /// Commands are matched case-insensitively and may carry a `@botname`
    /// suffix and trailing arguments, which are ignored.
    pub fn parse(text: &str) -> Inbound {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Inbound::Text(trimmed.to_string());
        };

        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default().to_lowercase();
        match name.as_str() {
            "start" => Inbound::Command(FormCommand::Start),
            "reset" => Inbound::Command(FormCommand::Reset),
            _ => Inbound::UnknownCommand(name),
        }
    }
}
