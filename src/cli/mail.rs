use anyhow::Result;
use clap::{Args, Subcommand};
use msgraph_lite::api::Scope;
use msgraph_lite::config::Config;
use serde::Serialize;
use tabled::Tabled;

use super::output::{print_json, print_output};
use super::utils::{short_time, truncate};
use super::{session, AuthArgs, OutputFormat};

#[derive(Args, Debug)]
pub struct MailCommand {
    #[command(subcommand)]
    pub command: MailSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum MailSubcommand {
    /// List mail messages
    List {
        /// Only unread messages in the inbox
        #[arg(short, long)]
        unread: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct MailRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Read")]
    read: String,
}

pub async fn execute(
    cmd: MailCommand,
    auth: &AuthArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    match cmd.command {
        MailSubcommand::List { unread } => list(auth, config, unread, format).await,
    }
}

async fn list(auth: &AuthArgs, config: &Config, unread: bool, format: OutputFormat) -> Result<()> {
    let api = session::open(auth, Some(Scope::Mail), config).await?;
    let messages = if unread {
        api.get_unread_outlook_emails().await?
    } else {
        api.get_outlook_emails().await?
    };

    if format == OutputFormat::Json {
        print_json(&messages);
        return Ok(());
    }

    let rows: Vec<MailRow> = messages
        .into_iter()
        .map(|m| MailRow {
            id: truncate(&m.id.unwrap_or_default(), 12),
            from: truncate(
                m.from.as_ref().and_then(|f| f.label()).unwrap_or_default(),
                25,
            ),
            subject: truncate(&m.subject.unwrap_or_default(), 40),
            received: m
                .received_date_time
                .as_deref()
                .map(short_time)
                .unwrap_or_default(),
            read: match m.is_read {
                Some(true) => "Yes".to_string(),
                Some(false) => "No".to_string(),
                None => "-".to_string(),
            },
        })
        .collect();

    print_output(&rows, format);
    Ok(())
}
