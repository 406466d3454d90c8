//! Session bootstrap: scopes, flow selection and the verification request.

use serde_json::Value;
use tracing::{info, warn};

use super::auth::AuthFlow;
use super::client::{GraphClient, GraphRequest, GraphTransport};
use super::graph::GraphApi;
use super::scopes::resolve_permissions;
use crate::config::{ApiConfig, Config};
use crate::error::{GraphError, Result};
use crate::types::Profile;

/// Everything needed to open a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub interactive: bool,
    /// Friendly scope names: `mail`, `calendar`, `teams-chat`, `teams-channel`
    pub scopes: Vec<String>,
    pub redirect_port: u16,
    pub api: ApiConfig,
}

impl SessionOptions {
    /// Seed options from the configuration file
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.auth.client_id.clone(),
            tenant_id: config.auth.tenant_id.clone(),
            interactive: config.auth.interactive,
            scopes: config.auth.scopes.clone(),
            redirect_port: config.auth.redirect_port,
            api: config.api.clone(),
        }
    }
}

/// Sign in and return a verified session.
///
/// Fails with `GraphError::Authorization` when the scopes are empty or
/// unknown, when the device code flow is missing its identifiers, or when the
/// signed-in profile cannot be read back.
pub async fn create_session(options: &SessionOptions) -> Result<GraphApi<GraphClient>> {
    let permissions = resolve_permissions(&options.scopes)?;
    let flow = AuthFlow::select(
        options.interactive,
        options.client_id.as_deref(),
        options.tenant_id.as_deref(),
    )?;

    info!(
        flow = flow.name(),
        permissions = %permissions.join(" "),
        "Creating Graph session"
    );

    let credential = flow
        .into_credential(options.redirect_port)
        .map_err(|e| GraphError::authorization(format!("{:#}", e)))?;
    let scopes = permissions.iter().map(|p| p.to_string()).collect();
    let client = GraphClient::new(credential, scopes, &options.api)
        .map_err(|e| GraphError::authorization(format!("{:#}", e)))?;

    connect(client).await
}

/// Verify `transport` with one profile request and wrap it.
///
/// The session is only returned if `GET /me` yields a non-empty display name.
pub async fn connect<T: GraphTransport>(transport: T) -> Result<GraphApi<T>> {
    let profile = match transport.get_object(&GraphRequest::new("/me")).await {
        Ok(Value::Null) => Err("empty profile response".to_string()),
        Ok(value) => serde_json::from_value::<Profile>(value)
            .map_err(|e| format!("unreadable profile: {}", e)),
        Err(err) => {
            warn!(error = %format!("{:#}", err), "Profile check failed");
            Err(format!("{:#}", err))
        }
    };

    let verified = profile.and_then(|profile| {
        profile
            .verified_name()
            .map(str::to_string)
            .ok_or_else(|| "profile has no display name".to_string())
    });

    match verified {
        Ok(display_name) => {
            info!(display_name = %display_name, "Authenticated with Microsoft Graph");
            Ok(GraphApi::new(transport))
        }
        Err(reason) => Err(GraphError::authorization(format!(
            "authentication verification failed: {}",
            reason
        ))),
    }
}
