//! Friendly scope names and the Graph permissions they grant.

use std::fmt;
use std::str::FromStr;

use crate::error::{GraphError, Result};

/// Baseline permission, always requested so the profile check can run.
pub const PERMISSION_USER_READ: &str = "User.Read";
pub const PERMISSION_MAIL_READ: &str = "Mail.Read";
pub const PERMISSION_CALENDARS_READ: &str = "Calendars.Read";
pub const PERMISSION_CHAT_READ: &str = "Chat.Read";
/// Requires admin consent in most tenants.
pub const PERMISSION_CHANNEL_MESSAGE_READ_ALL: &str = "ChannelMessage.Read.All";

/// A resource class the caller wants to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Mail,
    Calendar,
    TeamsChat,
    TeamsChannel,
}

impl Scope {
    pub const ALL: [Scope; 4] = [
        Scope::Mail,
        Scope::Calendar,
        Scope::TeamsChat,
        Scope::TeamsChannel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scope::Mail => "mail",
            Scope::Calendar => "calendar",
            Scope::TeamsChat => "teams-chat",
            Scope::TeamsChannel => "teams-channel",
        }
    }

    pub fn permission(self) -> &'static str {
        match self {
            Scope::Mail => PERMISSION_MAIL_READ,
            Scope::Calendar => PERMISSION_CALENDARS_READ,
            Scope::TeamsChat => PERMISSION_CHAT_READ,
            Scope::TeamsChannel => PERMISSION_CHANNEL_MESSAGE_READ_ALL,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.name() == s)
            .ok_or_else(|| GraphError::authorization("invalid scopes"))
    }
}

/// Map scope names to the permission set to request.
///
/// `User.Read` comes first, followed by one entry per distinct scope. Fails
/// with `invalid scopes` when `names` is empty or holds an unknown name.
pub fn resolve_permissions<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static str>> {
    if names.is_empty() {
        return Err(GraphError::authorization("invalid scopes"));
    }

    let mut scopes = names
        .iter()
        .map(|name| name.as_ref().parse::<Scope>())
        .collect::<Result<Vec<_>>>()?;
    scopes.sort();
    scopes.dedup();

    let mut permissions = vec![PERMISSION_USER_READ];
    permissions.extend(scopes.into_iter().map(Scope::permission));
    Ok(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_scopes_rejected() {
        let names: [&str; 0] = [];
        let err = resolve_permissions(&names).unwrap_err();
        assert!(err.is_authorization());
    }

    #[test]
    fn test_unknown_scopes_rejected() {
        assert!(resolve_permissions(&["contacts"]).unwrap_err().is_authorization());
        assert!(resolve_permissions(&["mail", "files"])
            .unwrap_err()
            .is_authorization());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!(resolve_permissions(&["Mail"]).is_err());
    }

    #[test]
    fn test_mail_only() {
        let permissions: HashSet<_> = resolve_permissions(&["mail"]).unwrap().into_iter().collect();
        assert_eq!(
            permissions,
            HashSet::from([PERMISSION_USER_READ, PERMISSION_MAIL_READ])
        );
    }

    #[test]
    fn test_all_scopes_once_each() {
        let permissions =
            resolve_permissions(&["teams-channel", "mail", "calendar", "teams-chat", "mail"])
                .unwrap();
        assert_eq!(permissions.len(), 5);
        let unique: HashSet<_> = permissions.iter().copied().collect();
        assert_eq!(
            unique,
            HashSet::from([
                PERMISSION_USER_READ,
                PERMISSION_MAIL_READ,
                PERMISSION_CALENDARS_READ,
                PERMISSION_CHAT_READ,
                PERMISSION_CHANNEL_MESSAGE_READ_ALL,
            ])
        );
    }

    #[test]
    fn test_scope_round_trips_through_name() {
        for scope in Scope::ALL {
            assert_eq!(scope.name().parse::<Scope>().unwrap(), scope);
        }
    }
}
