use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "orgreg")]
#[command(author, version, about = "Telegram bot that registers an organization's name, address and contact number", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling unless --webhook is given)
    Run {
        /// Serve Telegram updates over an HTTP webhook instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Apply database migrations and exit
    Migrate,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; no subcommand means `run` in polling mode.
    pub fn command_or_default(self) -> Commands {
        self.command.unwrap_or(Commands::Run { webhook: false })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_polling() {
        let cli = Cli::try_parse_from(["orgreg"]).unwrap();
        assert_eq!(cli.command_or_default(), Commands::Run { webhook: false });
    }

    #[test]
    fn test_run_webhook_flag() {
        let cli = Cli::try_parse_from(["orgreg", "run", "--webhook"]).unwrap();
        assert_eq!(cli.command_or_default(), Commands::Run { webhook: true });
    }

    #[test]
    fn test_migrate_subcommand() {
        let cli = Cli::try_parse_from(["orgreg", "migrate"]).unwrap();
        assert_eq!(cli.command_or_default(), Commands::Migrate);
    }
}
