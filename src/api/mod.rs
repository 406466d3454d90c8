pub mod auth;
pub mod client;
pub mod graph;
pub mod scopes;
pub mod session;

pub use auth::{AuthFlow, TokenCredential};
pub use client::{GraphClient, GraphRequest, GraphTransport};
pub use graph::GraphApi;
pub use scopes::{resolve_permissions, Scope};
pub use session::{connect, create_session, SessionOptions};
