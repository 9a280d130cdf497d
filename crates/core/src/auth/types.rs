use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;

use crate::config::AuthMethod;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// The desk user an authenticated request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "email", rename_all = "snake_case")]
pub enum ActingAs {
    /// The agent or admin with this (lower-cased) email.
    Agent(String),
    /// The lowest-id admin. Used when no acting email is configured.
    FirstAdmin,
}

impl ActingAs {
    /// From `auth.acting_user_email`. A blank value counts as unset.
    pub fn from_config(email: Option<&str>) -> Self {
        match email.map(str::trim) {
            Some(email) if !email.is_empty() => ActingAs::Agent(email.to_lowercase()),
            _ => ActingAs::FirstAdmin,
        }
    }
}

/// Result of a successful authentication: how the caller got in and which
/// desk user its requests act as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub method: AuthMethod,
    pub acting_as: ActingAs,
}
