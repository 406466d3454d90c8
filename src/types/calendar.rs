use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ItemBody;

/// Calendar event from Microsoft Graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub body: Option<ItemBody>,
    pub start: Option<DateTimeZone>,
    pub end: Option<DateTimeZone>,
    pub location: Option<Location>,
    pub organizer: Option<Organizer>,
    pub attendees: Option<Vec<Attendee>>,
    pub is_online_meeting: Option<bool>,
    pub online_meeting: Option<OnlineMeeting>,
    pub web_link: Option<String>,
    pub response_status: Option<ResponseStatus>,
    pub is_cancelled: Option<bool>,
    pub is_all_day: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarEvent {
    /// Whether the event intersects `[start, end)`.
    ///
    /// An event without an end is treated as a point in time. Events whose
    /// start cannot be read in UTC never overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let Some(event_start) = self.start.as_ref().and_then(DateTimeZone::to_utc) else {
            return false;
        };
        let event_end = self
            .end
            .as_ref()
            .and_then(DateTimeZone::to_utc)
            .unwrap_or(event_start);

        if event_end == event_start {
            event_start >= start && event_start < end
        } else {
            event_start < end && event_end > start
        }
    }
}

/// Date time with timezone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeZone {
    pub date_time: String,
    pub time_zone: Option<String>,
}

impl DateTimeZone {
    /// Interpret the value as UTC.
    ///
    /// Graph renders `dateTime` without an offset (`2024-05-01T09:30:00.0000000`)
    /// in the zone named by `timeZone`; only UTC values are accepted here.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let is_utc = self
            .time_zone
            .as_deref()
            .map_or(true, |tz| tz.eq_ignore_ascii_case("UTC"));
        if !is_utc {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.date_time) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.date_time, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Event location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub display_name: Option<String>,
    pub location_uri: Option<String>,
}

/// Event organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub email_address: Option<super::EmailAddress>,
}

/// Event attendee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email_address: Option<super::EmailAddress>,
    pub status: Option<ResponseStatus>,
    #[serde(rename = "type")]
    pub attendee_type: Option<String>,
}

/// Response status for RSVP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStatus {
    pub response: Option<String>,
    pub time: Option<String>,
}

/// Online meeting details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineMeeting {
    pub join_url: Option<String>,
}
