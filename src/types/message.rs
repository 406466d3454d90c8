use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{string_to_option_bool, ItemBody};

/// Identity of a user or application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// Sender of a chat or channel message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFrom {
    pub user: Option<Identity>,
    pub application: Option<Identity>,
}

impl MessageFrom {
    pub fn display_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .or(self.application.as_ref())
            .and_then(|identity| identity.display_name.as_deref())
    }
}

/// Team and channel a channel message belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelIdentity {
    pub team_id: Option<String>,
    pub channel_id: Option<String>,
}

/// Message posted in a Teams chat or channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub message_type: Option<String>,
    pub created_date_time: Option<String>,
    pub last_modified_date_time: Option<String>,
    pub chat_id: Option<String>,
    pub channel_identity: Option<ChannelIdentity>,
    pub from: Option<MessageFrom>,
    pub subject: Option<String>,
    pub summary: Option<String>,
    pub body: Option<ItemBody>,
    pub importance: Option<String>,
    pub web_url: Option<String>,
    /// Read-state flag; `None` when the service did not report one
    #[serde(default, deserialize_with = "string_to_option_bool")]
    pub is_read: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// True only when the message explicitly reports `isRead: false`
    pub fn is_unread(&self) -> bool {
        self.is_read == Some(false)
    }
}
