//! Read-only accessors over an authenticated Graph transport.
//!
//! Every accessor issues its calls one after another and fails as a whole:
//! if any call in a fan-out fails, nothing collected so far is returned.

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::client::{segment, GraphClient, GraphRequest, GraphTransport};
use crate::error::{GraphError, Result};
use crate::types::{CalendarEvent, Channel, Chat, ChatMessage, MailMessage, Team};

/// OData predicate for unread items
pub const UNREAD_FILTER: &str = "isRead eq false";

/// An authenticated, verified Graph session
pub struct GraphApi<T: GraphTransport = GraphClient> {
    transport: T,
}

impl<T: GraphTransport> GraphApi<T> {
    /// Only `session::connect` builds this, after the profile check succeeds.
    pub(crate) fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// All profile fields of the signed-in user.
    ///
    /// Permissions: `User.Read`. Broader directory permissions return more fields.
    pub async fn get_user_info(&self) -> Result<Map<String, Value>> {
        self.user_info()
            .await
            .map_err(GraphError::request("Failed to get user info"))
    }

    /// Messages of every channel of every joined team, keyed by team id.
    ///
    /// Permissions: `ChannelMessage.Read.All` (admin consent).
    pub async fn get_teams_channel_messages(&self) -> Result<BTreeMap<String, Vec<ChatMessage>>> {
        self.channel_messages(false)
            .await
            .map_err(GraphError::request("Failed to get Teams messages"))
    }

    /// Unread channel messages, keyed by team id. Filtered by the service.
    ///
    /// Permissions: `ChannelMessage.Read.All` (admin consent).
    pub async fn get_unread_teams_channel_messages(
        &self,
    ) -> Result<BTreeMap<String, Vec<ChatMessage>>> {
        self.channel_messages(true)
            .await
            .map_err(GraphError::request("Failed to get Teams messages"))
    }

    /// Messages of one chat.
    ///
    /// Permissions: `Chat.Read`.
    pub async fn get_teams_chat_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        self.fetch_list(chat_messages_request(chat_id))
            .await
            .map_err(GraphError::request("Failed to get chat messages"))
    }

    /// Every chat of the signed-in user.
    ///
    /// Permissions: `Chat.Read`.
    pub async fn get_all_teams_chats(&self) -> Result<Vec<Chat>> {
        self.fetch_list(GraphRequest::new("/me/chats"))
            .await
            .map_err(GraphError::request("Failed to get chats"))
    }

    /// Unread messages of every chat, keyed by chat id.
    ///
    /// Unlike channel messages this is filtered locally: only messages that
    /// report `isRead: false` are kept, in their original order.
    ///
    /// Permissions: `Chat.Read`.
    pub async fn get_all_unread_teams_chat_messages(
        &self,
    ) -> Result<BTreeMap<String, Vec<ChatMessage>>> {
        self.unread_chat_messages()
            .await
            .map_err(GraphError::request("Failed to get chat messages"))
    }

    /// Messages across all mail folders.
    ///
    /// Permissions: `Mail.Read`.
    pub async fn get_outlook_emails(&self) -> Result<Vec<MailMessage>> {
        self.fetch_list(GraphRequest::new("/me/messages"))
            .await
            .map_err(GraphError::request("Failed to get emails"))
    }

    /// Unread messages in the inbox. Filtered by the service.
    ///
    /// Permissions: `Mail.Read`.
    pub async fn get_unread_outlook_emails(&self) -> Result<Vec<MailMessage>> {
        let request = GraphRequest::new("/me/mailFolders/inbox/messages").filter(UNREAD_FILTER);
        self.fetch_list(request)
            .await
            .map_err(GraphError::request("Failed to get emails"))
    }

    /// Every event of the user's calendars.
    ///
    /// Permissions: `Calendars.Read`.
    pub async fn get_all_calendar_events(&self) -> Result<Vec<CalendarEvent>> {
        self.fetch_list(GraphRequest::new("/me/events"))
            .await
            .map_err(GraphError::request("Failed to get calendar events"))
    }

    /// Events overlapping the next 24 hours, from now, in UTC.
    ///
    /// Permissions: `Calendars.Read`.
    pub async fn get_todays_calendar_events(&self) -> Result<Vec<CalendarEvent>> {
        let start = Utc::now();
        let end = start + Duration::hours(24);
        self.events_between(start, end)
            .await
            .map_err(GraphError::request("Failed to get todays calendar events"))
    }

    /// Events overlapping `[start, end)`.
    ///
    /// The window is sent to the calendar view and re-checked locally, so
    /// events outside it never appear.
    ///
    /// Permissions: `Calendars.Read`.
    pub async fn get_calendar_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        self.events_between(start, end)
            .await
            .map_err(GraphError::request("Failed to get calendar events"))
    }

    async fn user_info(&self) -> anyhow::Result<Map<String, Value>> {
        let request = GraphRequest::new("/me");
        debug!(path = %request.path, "Fetching object");
        let value = self
            .transport
            .get_object(&request)
            .await
            .context("GET /me")?;

        match value {
            Value::Object(fields) => Ok(fields),
            Value::Null => Err(anyhow::anyhow!("Empty profile response")),
            other => Err(anyhow::anyhow!(
                "Expected a profile object, got {}",
                json_kind(&other)
            )),
        }
    }

    async fn channel_messages(
        &self,
        unread_only: bool,
    ) -> anyhow::Result<BTreeMap<String, Vec<ChatMessage>>> {
        let teams: Vec<Team> = self.fetch_list(GraphRequest::new("/me/joinedTeams")).await?;

        let mut messages = BTreeMap::new();
        for team in teams {
            let team_path = format!("/teams/{}", segment(&team.id));
            let channels: Vec<Channel> = self
                .fetch_list(GraphRequest::new(format!("{}/channels", team_path)))
                .await?;

            let mut team_messages = Vec::new();
            for channel in channels {
                let mut request = GraphRequest::new(format!(
                    "{}/channels/{}/messages",
                    team_path,
                    segment(&channel.id)
                ));
                if unread_only {
                    request = request.filter(UNREAD_FILTER);
                }
                team_messages.extend(self.fetch_list::<ChatMessage>(request).await?);
            }
            messages.insert(team.id, team_messages);
        }

        Ok(messages)
    }

    async fn unread_chat_messages(&self) -> anyhow::Result<BTreeMap<String, Vec<ChatMessage>>> {
        let chats: Vec<Chat> = self.fetch_list(GraphRequest::new("/me/chats")).await?;

        let mut messages = BTreeMap::new();
        for chat in chats {
            let chat_messages: Vec<ChatMessage> =
                self.fetch_list(chat_messages_request(&chat.id)).await?;
            let unread: Vec<ChatMessage> = chat_messages
                .into_iter()
                .filter(ChatMessage::is_unread)
                .collect();
            messages.insert(chat.id, unread);
        }

        Ok(messages)
    }

    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<CalendarEvent>> {
        let request = GraphRequest::new("/me/calendar/calendarView").range(start, end);
        let events: Vec<CalendarEvent> = self.fetch_list(request).await?;

        let total = events.len();
        let in_window: Vec<CalendarEvent> = events
            .into_iter()
            .filter(|event| event.overlaps(start, end))
            .collect();
        if in_window.len() < total {
            warn!(
                dropped = total - in_window.len(),
                "Dropped events outside the requested window"
            );
        }

        Ok(in_window)
    }

    async fn fetch_list<R: DeserializeOwned>(&self, request: GraphRequest) -> anyhow::Result<Vec<R>> {
        debug!(path = %request.path, filter = ?request.filter, "Fetching collection");
        let values = self
            .transport
            .get_collection(&request)
            .await
            .with_context(|| format!("GET {}", request.path))?;

        values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<R>, _>>()
            .with_context(|| format!("Failed to parse response from {}", request.path))
    }
}

fn chat_messages_request(chat_id: &str) -> GraphRequest {
    GraphRequest::new(format!("/me/chats/{}/messages", segment(chat_id)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
