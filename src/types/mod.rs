mod calendar;
mod mail;
mod message;
mod team;
mod user;

pub use calendar::*;
pub use mail::*;
pub use message::*;
pub use team::*;
pub use user::*;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Seconds before the real expiry at which a token is treated as expired
const EXPIRY_SKEW_S: u64 = 60;

pub(crate) fn get_epoch_s() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Access token with expiration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    pub expires: u64,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in: u64) -> Self {
        Self {
            value: value.into(),
            expires: get_epoch_s().saturating_add(expires_in),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires <= get_epoch_s().saturating_add(EXPIRY_SKEW_S)
    }
}

/// What the user needs to finish a device code sign-in
#[derive(Debug, Clone)]
pub struct DeviceCodeInfo {
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds left to enter the code
    pub expires_in: u64,
}

/// Rich text body shared by chat messages, mail and events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: Option<String>,
    pub content: Option<String>,
}

/// Accept booleans sent either as JSON booleans or as "true"/"false" strings
pub fn string_to_option_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid boolean string: {}",
                s
            ))),
        },
        Some(_) => Err(serde::de::Error::custom("Unexpected type")),
    }
}
