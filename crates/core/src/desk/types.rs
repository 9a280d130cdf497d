//! Domain types for tickets, posts and users.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DeskError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Trim and lower-case an email address, rejecting malformed input.
pub fn normalize_email(raw: &str) -> Result<String, DeskError> {
    let email = raw.trim().to_lowercase();
    if EMAIL_RE.is_match(&email) {
        Ok(email)
    } else {
        Err(DeskError::validation(format!("malformed email: {}", raw)))
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Agent has spoken last, or the ticket is brand new and not yet triaged.
    Open,
    /// Waiting on an agent.
    Pending,
    Closed,
    Spam,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::Pending,
        TicketStatus::Closed,
        TicketStatus::Spam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Pending => "pending",
            TicketStatus::Closed => "closed",
            TicketStatus::Spam => "spam",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "pending" => Ok(TicketStatus::Pending),
            "closed" => Ok(TicketStatus::Closed),
            "spam" => Ok(TicketStatus::Spam),
            other => Err(DeskError::validation(format!(
                "unknown ticket status: {}",
                other
            ))),
        }
    }
}

/// Explicit status change requested by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    Close,
    Reopen,
    Spam,
}

impl StatusChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusChange::Close => "close",
            StatusChange::Reopen => "reopen",
            StatusChange::Spam => "spam",
        }
    }

    pub fn target(&self) -> TicketStatus {
        match self {
            StatusChange::Close => TicketStatus::Closed,
            StatusChange::Reopen => TicketStatus::Open,
            StatusChange::Spam => TicketStatus::Spam,
        }
    }
}

impl FromStr for StatusChange {
    type Err = DeskError;

    /// Accepts the values the admin UI sends (`closed`, `reopen`, `spam`)
    /// plus a few aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" | "close" => Ok(StatusChange::Close),
            "reopen" | "open" | "reopened" => Ok(StatusChange::Reopen),
            "spam" => Ok(StatusChange::Spam),
            other => Err(DeskError::validation(format!(
                "unsupported status change: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Agent,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Agent => "agent",
            UserRole::User => "user",
        }
    }

    /// Admins and agents work tickets; plain users only open and reply to them.
    pub fn is_agent(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Agent)
    }
}

impl FromStr for UserRole {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "agent" => Ok(UserRole::Agent),
            "user" => Ok(UserRole::User),
            other => Err(DeskError::validation(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_agent(&self) -> bool {
        self.role.is_agent()
    }
}

/// Request to register a user explicitly.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// Partial update of a user profile.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

// ============================================================================
// Topics and posts
// ============================================================================

/// A support ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub subject: String,
    /// The requester.
    pub user_id: i64,
    pub forum_id: i64,
    pub current_status: TicketStatus,
    pub assigned_user_id: Option<i64>,
    pub private: bool,
    /// False until an agent opens the ticket for the first time.
    pub viewed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    /// The message that opened the ticket.
    Initial,
    /// Public reply.
    Reply,
    /// Internal note written by an agent.
    Note,
    /// System-generated note recording an assignment or status change.
    Audit,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Initial => "initial",
            PostKind::Reply => "reply",
            PostKind::Note => "note",
            PostKind::Audit => "audit",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, PostKind::Note | PostKind::Audit)
    }
}

impl FromStr for PostKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(PostKind::Initial),
            "reply" => Ok(PostKind::Reply),
            "note" => Ok(PostKind::Note),
            "audit" => Ok(PostKind::Audit),
            other => Err(DeskError::validation(format!("unknown post kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub user_id: i64,
    pub body: String,
    pub kind: PostKind,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_internal(&self) -> bool {
        self.kind.is_internal()
    }
}

/// A status change that was actually committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub topic_id: i64,
    pub from: TicketStatus,
    pub to: TicketStatus,
}

// ============================================================================
// Requests and outcomes
// ============================================================================

/// Request to open a new ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub requester_name: String,
    pub requester_email: String,
    pub subject: String,
    pub body: String,
    pub forum_id: i64,
    pub private: bool,
    /// When true the requester opened the ticket themselves; otherwise the
    /// acting agent opened it on their behalf.
    pub submitted_by_requester: bool,
}

#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub topic: Topic,
    pub post: Post,
    pub user: User,
    pub user_created: bool,
}

/// Request to add a post to an existing ticket.
#[derive(Debug, Clone)]
pub struct NewReply {
    pub topic_id: i64,
    pub author_id: i64,
    pub body: String,
    pub internal: bool,
    pub change_status: Option<StatusChange>,
}

#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub topic: Topic,
    pub post: Post,
    pub audit_post: Option<Post>,
    pub transition: Option<StatusTransition>,
}

/// Result of a bulk action over several tickets.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub topics: Vec<Topic>,
    pub audit_posts: Vec<Post>,
    pub transitions: Vec<StatusTransition>,
}

#[derive(Debug, Clone)]
pub struct TicketView {
    pub topic: Topic,
    pub posts: Vec<Post>,
    pub transition: Option<StatusTransition>,
}
