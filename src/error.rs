use thiserror::Error;

/// Errors surfaced by session creation and the Graph accessors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Invalid credentials or scopes, or the session could not be verified
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// A Graph request failed; `source` holds the underlying cause
    #[error("{message}: {source:#}")]
    Request {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl GraphError {
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Wrap any failure into a `Request` error tagged with `message`.
    ///
    /// Meant for `map_err`: `fetch().await.map_err(GraphError::request("Failed to get emails"))`.
    pub fn request(message: &str) -> impl FnOnce(anyhow::Error) -> Self + '_ {
        move |source| Self::Request {
            message: message.to_string(),
            source,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_request_error_keeps_cause() {
        let err = GraphError::request("Failed to get emails")(anyhow!("503 Service Unavailable"));
        assert!(err.is_request());
        assert_eq!(
            err.to_string(),
            "Failed to get emails: 503 Service Unavailable"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_request_error_shows_context_chain() {
        let cause = anyhow!("connection reset").context("GET /me/chats");
        let err = GraphError::request("Failed to get chats")(cause);
        assert_eq!(
            err.to_string(),
            "Failed to get chats: GET /me/chats: connection reset"
        );
    }

    #[test]
    fn test_authorization_error() {
        let err = GraphError::authorization("invalid scopes");
        assert!(err.is_authorization());
        assert_eq!(err.to_string(), "Authorization failed: invalid scopes");
    }
}
