use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};
use crate::config::AuthMethod;
use crate::error::DeskError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The configured acting email matches no desk user.
    #[error("No desk user with email {0}")]
    UnknownAgent(String),

    #[error("User {user_id} is not an agent")]
    NotAnAgent { user_id: i64 },

    #[error("No admin account exists")]
    NoAdmin,

    #[error(transparent)]
    Desk(#[from] DeskError),
}

impl AuthError {
    /// The caller got in but may not act as the resolved user.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            AuthError::UnknownAgent(_) | AuthError::NotAnAgent { .. } | AuthError::NoAdmin
        )
    }

    /// Short label for the auth failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "missing_credentials",
            AuthError::InvalidCredentials(_) => "invalid_credentials",
            AuthError::ConfigurationError(_) => "configuration",
            AuthError::UnknownAgent(_) => "unknown_agent",
            AuthError::NotAnAgent { .. } => "not_an_agent",
            AuthError::NoAdmin => "no_admin",
            AuthError::Desk(_) => "store",
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request and return the identity
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    fn method(&self) -> AuthMethod;
}
