use async_trait::async_trait;

use super::{ActingAs, AuthError, AuthRequest, Authenticator, Identity};
use crate::config::AuthMethod;

/// Lets every request in as the configured desk user.
/// Must be explicitly configured - the system won't default to this
pub struct NoneAuthenticator {
    acting_as: ActingAs,
}

impl NoneAuthenticator {
    pub fn new(acting_as: ActingAs) -> Self {
        Self { acting_as }
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity {
            method: AuthMethod::None,
            acting_as: self.acting_as.clone(),
        })
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::None
    }
}
