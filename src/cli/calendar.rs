use anyhow::Result;
use clap::{Args, Subcommand};
use msgraph_lite::api::Scope;
use msgraph_lite::config::Config;
use msgraph_lite::types::CalendarEvent;
use serde::Serialize;
use tabled::Tabled;

use super::output::{print_json, print_output};
use super::utils::{short_time, truncate};
use super::{session, AuthArgs, OutputFormat};

#[derive(Args, Debug)]
pub struct CalendarCommand {
    #[command(subcommand)]
    pub command: CalendarSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CalendarSubcommand {
    /// List all calendar events
    List,

    /// Events in the next 24 hours
    Today,
}

#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub async fn execute(
    cmd: CalendarCommand,
    auth: &AuthArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let api = session::open(auth, Some(Scope::Calendar), config).await?;
    let events = match cmd.command {
        CalendarSubcommand::List => api.get_all_calendar_events().await?,
        CalendarSubcommand::Today => api.get_todays_calendar_events().await?,
    };
    display_events(events, format);
    Ok(())
}

fn display_events(events: Vec<CalendarEvent>, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_json(&events);
        return;
    }

    let rows: Vec<EventRow> = events
        .into_iter()
        .map(|e| {
            let time = e
                .start
                .map(|s| short_time(&s.date_time))
                .unwrap_or_default();

            let location = e
                .location
                .and_then(|l| l.display_name)
                .filter(|name| !name.is_empty())
                .or_else(|| {
                    if e.is_online_meeting == Some(true) {
                        Some("Teams Meeting".to_string())
                    } else {
                        None
                    }
                })
                .unwrap_or_default();

            let status = if e.is_cancelled == Some(true) {
                "cancelled".to_string()
            } else {
                e.response_status
                    .and_then(|r| r.response)
                    .unwrap_or_else(|| "none".to_string())
            };

            EventRow {
                id: truncate(&e.id.unwrap_or_default(), 12),
                time,
                subject: truncate(&e.subject.unwrap_or_default(), 35),
                location: truncate(&location, 25),
                status,
            }
        })
        .collect();

    print_output(&rows, format);
}
