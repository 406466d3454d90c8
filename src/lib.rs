//! msgraph-lite - read-only Microsoft Graph access for Teams, Outlook mail and calendar
//!
//! Open a session with [`create_session`], then call the accessors on [`GraphApi`].

pub mod api;
pub mod config;
pub mod error;
pub mod types;

pub use api::{connect, create_session, GraphApi, GraphClient, SessionOptions};
pub use config::Config;
pub use error::GraphError;
