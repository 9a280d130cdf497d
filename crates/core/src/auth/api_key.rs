//! API Key authentication.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ActingAs, AuthError, AuthRequest, Authenticator, Identity};
use crate::config::AuthMethod;

/// Authenticator that validates requests against a configured API key.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header (scheme is case-insensitive)
/// - `X-API-Key: <key>` header
///
/// Only the SHA-256 digest of the key is kept. Digests are compared in
/// constant time, so neither the key length nor a matching prefix leaks.
pub struct ApiKeyAuthenticator {
    key_digest: Vec<u8>,
    acting_as: ActingAs,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: &str, acting_as: ActingAs) -> Self {
        Self {
            key_digest: Sha256::digest(api_key.as_bytes()).to_vec(),
            acting_as,
        }
    }

    fn extract_key(request: &AuthRequest) -> Option<&str> {
        if let Some((scheme, key)) = request
            .header("authorization")
            .and_then(|value| value.split_once(' '))
        {
            if scheme.eq_ignore_ascii_case("bearer") {
                return Some(key.trim());
            }
        }
        request.header("x-api-key").map(str::trim)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = Self::extract_key(request).ok_or(AuthError::NotAuthenticated)?;
        let provided_digest = Sha256::digest(provided.as_bytes());

        if constant_time_eq(provided_digest.as_slice(), &self.key_digest) {
            Ok(Identity {
                method: AuthMethod::ApiKey,
                acting_as: self.acting_as.clone(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::ApiKey
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
