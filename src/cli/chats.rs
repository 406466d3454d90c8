use anyhow::Result;
use clap::{Args, Subcommand};
use msgraph_lite::api::Scope;
use msgraph_lite::config::Config;
use serde::Serialize;
use tabled::Tabled;

use super::output::{print_json, print_output};
use super::utils::{message_columns, short_time, truncate};
use super::{session, AuthArgs, OutputFormat};

#[derive(Args, Debug)]
pub struct ChatsCommand {
    #[command(subcommand)]
    pub command: ChatsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ChatsSubcommand {
    /// List all chats
    List,

    /// Get messages from a chat
    Messages {
        /// Chat ID
        chat_id: String,
    },

    /// Unread messages across all chats
    Unread,
}

#[derive(Debug, Serialize, Tabled)]
struct ChatRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Topic")]
    topic: String,
    #[tabled(rename = "Type")]
    chat_type: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

#[derive(Debug, Serialize, Tabled)]
struct MessageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Content")]
    content: String,
}

#[derive(Debug, Serialize, Tabled)]
struct UnreadRow {
    #[tabled(rename = "Chat")]
    chat: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Content")]
    content: String,
}

pub async fn execute(
    cmd: ChatsCommand,
    auth: &AuthArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    match cmd.command {
        ChatsSubcommand::List => list(auth, config, format).await,
        ChatsSubcommand::Messages { chat_id } => messages(auth, config, &chat_id, format).await,
        ChatsSubcommand::Unread => unread(auth, config, format).await,
    }
}

async fn list(auth: &AuthArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let api = session::open(auth, Some(Scope::TeamsChat), config).await?;
    let chats = api.get_all_teams_chats().await?;

    if format == OutputFormat::Json {
        print_json(&chats);
        return Ok(());
    }

    let rows: Vec<ChatRow> = chats
        .into_iter()
        .map(|chat| ChatRow {
            id: chat.id,
            topic: truncate(&chat.topic.unwrap_or_else(|| "Direct Chat".to_string()), 30),
            chat_type: chat.chat_type.unwrap_or_else(|| "chat".to_string()),
            updated: chat
                .last_updated_date_time
                .as_deref()
                .map(short_time)
                .unwrap_or_default(),
        })
        .collect();

    print_output(&rows, format);
    Ok(())
}

async fn messages(
    auth: &AuthArgs,
    config: &Config,
    chat_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let api = session::open(auth, Some(Scope::TeamsChat), config).await?;
    let messages = api.get_teams_chat_messages(chat_id).await?;

    if format == OutputFormat::Json {
        print_json(&messages);
        return Ok(());
    }

    let rows: Vec<MessageRow> = messages
        .iter()
        .map(|message| {
            let (from, time, content) = message_columns(message);
            MessageRow {
                id: message.id.clone(),
                from,
                time,
                content,
            }
        })
        .collect();

    print_output(&rows, format);
    Ok(())
}

async fn unread(auth: &AuthArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let api = session::open(auth, Some(Scope::TeamsChat), config).await?;
    let by_chat = api.get_all_unread_teams_chat_messages().await?;

    if format == OutputFormat::Json {
        print_json(&by_chat);
        return Ok(());
    }

    let rows: Vec<UnreadRow> = by_chat
        .iter()
        .flat_map(|(chat_id, messages)| {
            messages.iter().map(move |message| {
                let (from, time, content) = message_columns(message);
                UnreadRow {
                    chat: truncate(chat_id, 20),
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
