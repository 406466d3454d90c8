use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{string_to_option_bool, ItemBody};

/// Email address with optional name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    pub address: Option<String>,
    pub name: Option<String>,
}

/// Recipient wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: Option<EmailAddress>,
}

impl Recipient {
    /// Name if known, otherwise the address
    pub fn label(&self) -> Option<&str> {
        let email = self.email_address.as_ref()?;
        email.name.as_deref().or(email.address.as_deref())
    }
}

/// Email message from Outlook
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub body: Option<ItemBody>,
    pub from: Option<Recipient>,
    pub to_recipients: Option<Vec<Recipient>>,
    pub cc_recipients: Option<Vec<Recipient>>,
    pub received_date_time: Option<String>,
    pub sent_date_time: Option<String>,
    #[serde(default, deserialize_with = "string_to_option_bool")]
    pub is_read: Option<bool>,
    pub is_draft: Option<bool>,
    pub has_attachments: Option<bool>,
    pub importance: Option<String>,
    pub web_link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
