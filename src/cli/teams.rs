use anyhow::Result;
use clap::{Args, Subcommand};
use msgraph_lite::api::Scope;
use msgraph_lite::config::Config;
use serde::Serialize;
use tabled::Tabled;

use super::output::{print_json, print_output};
use super::utils::{message_columns, truncate};
use super::{session, AuthArgs, OutputFormat};

#[derive(Args, Debug)]
pub struct TeamsCommand {
    #[command(subcommand)]
    pub command: TeamsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamsSubcommand {
    /// Messages from every channel of every joined team
    Messages {
        /// Only unread messages
        #[arg(short, long)]
        unread: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct ChannelMessageRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Content")]
    content: String,
}

pub async fn execute(
    cmd: TeamsCommand,
    auth: &AuthArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    match cmd.command {
        TeamsSubcommand::Messages { unread } => messages(auth, config, unread, format).await,
    }
}

async fn messages(auth: &AuthArgs, config: &Config, unread: bool, format: OutputFormat) -> Result<()> {
    let api = session::open(auth, Some(Scope::TeamsChannel), config).await?;
    let by_team = if unread {
        api.get_unread_teams_channel_messages().await?
    } else {
        api.get_teams_channel_messages().await?
    };

    if format == OutputFormat::Json {
        print_json(&by_team);
        return Ok(());
    }

    let rows: Vec<ChannelMessageRow> = by_team
        .iter()
        .flat_map(|(team_id, messages)| {
            messages.iter().map(move |message| {
                let (from, time, content) = message_columns(message);
                let channel = message
                    .channel_identity
                    .as_ref()
                    .and_then(|c| c.channel_id.as_deref())
                    .unwrap_or_default();
                ChannelMessageRow {
                    team: truncate(team_id, 12),
                    channel: truncate(channel, 12),
                    from,
                    time,
                    content,
                }
            })
        })
        .collect();

    print_output(&rows, format);
    Ok(())
}
