use anyhow::{bail, Result};
use msgraph_lite::api::{create_session, GraphApi, Scope, SessionOptions};
use msgraph_lite::config::Config;

use super::AuthArgs;

/// Merge config, flags and the command's own scope into session options
pub fn options(args: &AuthArgs, scope: Option<Scope>, config: &Config) -> Result<SessionOptions> {
    let mut options = SessionOptions::from_config(config);

    if args.client_id.is_some() {
        options.client_id = args.client_id.clone();
    }
    if args.tenant_id.is_some() {
        options.tenant_id = args.tenant_id.clone();
    }
    options.interactive |= args.interactive;

    options.scopes.extend(args.scopes.iter().cloned());
    if let Some(scope) = scope {
        options.scopes.push(scope.name().to_string());
    }
    options.scopes.sort();
    options.scopes.dedup();

    if options.scopes.is_empty() {
        bail!("No scopes requested. Pass at least one --scope (mail, calendar, teams-chat, teams-channel).");
    }

    Ok(options)
}

/// Sign in for a command
pub async fn open(args: &AuthArgs, scope: Option<Scope>, config: &Config) -> Result<GraphApi> {
    let options = options(args, scope, config)?;
    Ok(create_session(&options).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.auth.client_id = Some("from-config".to_string());
        config.auth.tenant_id = Some("tenant".to_string());
        config.auth.scopes = vec!["calendar".to_string()];

        let args = AuthArgs {
            client_id: Some("from-flag".to_string()),
            tenant_id: None,
            interactive: true,
            scopes: vec!["mail".to_string(), "calendar".to_string()],
        };

        let options = options(&args, Some(Scope::TeamsChat), &config).unwrap();
        assert_eq!(options.client_id.as_deref(), Some("from-flag"));
        assert_eq!(options.tenant_id.as_deref(), Some("tenant"));
        assert!(options.interactive);
        assert_eq!(options.scopes, vec!["calendar", "mail", "teams-chat"]);
    }

    #[test]
    fn test_no_scopes_is_rejected() {
        let args = AuthArgs::default();
        assert!(options(&args, None, &Config::default()).is_err());
    }
}
