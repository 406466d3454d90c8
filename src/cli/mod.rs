pub mod calendar;
pub mod chats;
pub mod completions;
pub mod mail;
pub mod output;
pub mod scopes;
pub mod session;
pub mod teams;
pub mod utils;
pub mod whoami;

use clap::{Args, Parser, Subcommand, ValueEnum};
/// Read-only Microsoft Graph CLI for Teams, Outlook mail and calendar
#[derive(Parser, Debug)]
#[command(name = "msgraph-lite")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (defaults to the config file's default_format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Default)]
pub struct AuthArgs {
    /// Application (client) ID of the app registration
    #[arg(long, env = "CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Directory (tenant) ID
    #[arg(long, env = "TENANT_ID", global = true)]
    pub tenant_id: Option<String>,

    /// Sign in through the browser instead of a device code
    #[arg(short, long, global = true)]
    pub interactive: bool,

    /// Extra scopes to request (mail, calendar, teams-chat, teams-channel)
    #[arg(short, long = "scope", value_delimiter = ',', global = true)]
    pub scopes: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the signed-in user's profile
    Whoami,

    /// Teams channel operations
    Teams(teams::TeamsCommand),

    /// Chat operations
    Chats(chats::ChatsCommand),

    /// Outlook mail operations
    Mail(mail::MailCommand),

    /// Outlook calendar operations
    Calendar(calendar::CalendarCommand),

    /// List scope names and the permissions they grant
    Scopes,

    /// Generate shell completions
    Completions(completions::CompletionsCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output (best for scripts and agents)
    Json,
    /// Table output (best for humans)
    #[default]
    Table,
    /// Plain output (minimal, for scripting)
    Plain,
}

impl OutputFormat {
    /// Explicit flag first, then the configured default, then table
    pub fn resolve(flag: Option<OutputFormat>, configured: &str) -> OutputFormat {
        flag.or_else(|| OutputFormat::from_str(configured, true).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution() {
        assert_eq!(
            OutputFormat::resolve(Some(OutputFormat::Json), "plain"),
            OutputFormat::Json
        );
        assert_eq!(OutputFormat::resolve(None, "plain"), OutputFormat::Plain);
        assert_eq!(OutputFormat::resolve(None, "yaml"), OutputFormat::Table);
    }

    #[test]
    fn test_global_auth_flags() {
        let cli = Cli::parse_from(["msgraph-lite", "whoami", "--scope", "mail,calendar", "-i"]);
        assert!(matches!(cli.command, Commands::Whoami));
        assert!(cli.auth.interactive);
        assert_eq!(cli.auth.scopes, vec!["mail", "calendar"]);

        let cli = Cli::parse_from(["msgraph-lite", "mail", "list", "--unread"]);
        assert!(matches!(
            cli.command,
            Commands::Mail(mail::MailCommand {
                command: mail::MailSubcommand::List { unread: true }
            })
        ));
    }
}
