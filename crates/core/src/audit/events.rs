use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuditError;
use crate::desk::{PostKind, TicketStatus, UserRole};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketCreated {
        topic_id: i64,
        /// The requester the ticket belongs to
        requester_id: i64,
        /// Who opened the ticket (an agent, or the requester themselves)
        created_by: i64,
        /// Whether the requester was registered as part of this ticket
        user_created: bool,
        notification_sent: bool,
    },
    TicketViewed {
        topic_id: i64,
        viewer_id: i64,
    },
    TicketStatusChanged {
        topic_id: i64,
        from_status: TicketStatus,
        to_status: TicketStatus,
        changed_by: i64,
        /// Set when the change came from an explicit status action rather
        /// than as a side effect of a reply or view
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    TicketAssigned {
        topic_id: i64,
        assigned_user_id: i64,
        assigned_by: i64,
    },
    PostCreated {
        topic_id: i64,
        post_id: i64,
        author_id: i64,
        kind: PostKind,
    },

    // Users
    UserCreated {
        user_id: i64,
        role: UserRole,
        /// None when the user was registered implicitly or at bootstrap
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created_by: Option<i64>,
    },
    UserUpdated {
        user_id: i64,
        updated_by: i64,
    },

    // Knowledge base
    RecordReordered {
        /// "doc" or "category"
        object: String,
        record_id: i64,
        position: i64,
        reordered_by: i64,
    },

    // Settings
    SettingsUpdated {
        keys: Vec<String>,
        updated_by: i64,
    },
}

/// Event kinds, as stored in the `event_type` column and accepted by the
/// audit query API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    ServiceStarted,
    ServiceStopped,
    TicketCreated,
    TicketViewed,
    TicketStatusChanged,
    TicketAssigned,
    PostCreated,
    UserCreated,
    UserUpdated,
    RecordReordered,
    SettingsUpdated,
}

impl AuditEventKind {
    pub const ALL: [AuditEventKind; 11] = [
        AuditEventKind::ServiceStarted,
        AuditEventKind::ServiceStopped,
        AuditEventKind::TicketCreated,
        AuditEventKind::TicketViewed,
        AuditEventKind::TicketStatusChanged,
        AuditEventKind::TicketAssigned,
        AuditEventKind::PostCreated,
        AuditEventKind::UserCreated,
        AuditEventKind::UserUpdated,
        AuditEventKind::RecordReordered,
        AuditEventKind::SettingsUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::ServiceStarted => "service_started",
            AuditEventKind::ServiceStopped => "service_stopped",
            AuditEventKind::TicketCreated => "ticket_created",
            AuditEventKind::TicketViewed => "ticket_viewed",
            AuditEventKind::TicketStatusChanged => "ticket_status_changed",
            AuditEventKind::TicketAssigned => "ticket_assigned",
            AuditEventKind::PostCreated => "post_created",
            AuditEventKind::UserCreated => "user_created",
            AuditEventKind::UserUpdated => "user_updated",
            AuditEventKind::RecordReordered => "record_reordered",
            AuditEventKind::SettingsUpdated => "settings_updated",
        }
    }

    /// Kinds that always carry a topic id, i.e. a ticket's history.
    pub fn is_ticket_event(&self) -> bool {
        matches!(
            self,
            AuditEventKind::TicketCreated
                | AuditEventKind::TicketViewed
                | AuditEventKind::TicketStatusChanged
                | AuditEventKind::TicketAssigned
                | AuditEventKind::PostCreated
        )
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEventKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AuditEventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AuditError::UnknownEventType(s.to_string()))
    }
}

impl AuditEvent {
    pub fn kind(&self) -> AuditEventKind {
        match self {
            Self::ServiceStarted { .. } => AuditEventKind::ServiceStarted,
            Self::ServiceStopped { .. } => AuditEventKind::ServiceStopped,
            Self::TicketCreated { .. } => AuditEventKind::TicketCreated,
            Self::TicketViewed { .. } => AuditEventKind::TicketViewed,
            Self::TicketStatusChanged { .. } => AuditEventKind::TicketStatusChanged,
            Self::TicketAssigned { .. } => AuditEventKind::TicketAssigned,
            Self::PostCreated { .. } => AuditEventKind::PostCreated,
            Self::UserCreated { .. } => AuditEventKind::UserCreated,
            Self::UserUpdated { .. } => AuditEventKind::UserUpdated,
            Self::RecordReordered { .. } => AuditEventKind::RecordReordered,
            Self::SettingsUpdated { .. } => AuditEventKind::SettingsUpdated,
        }
    }

    /// The ticket this event belongs to.
    pub fn topic_id(&self) -> Option<i64> {
        match self {
            Self::TicketCreated { topic_id, .. }
            | Self::TicketViewed { topic_id, .. }
            | Self::TicketStatusChanged { topic_id, .. }
            | Self::TicketAssigned { topic_id, .. }
            | Self::PostCreated { topic_id, .. } => Some(*topic_id),
            _ => None,
        }
    }

    /// The desk user who caused the event. `None` for service lifecycle
    /// events and for requesters registered implicitly by a new ticket.
    pub fn actor_id(&self) -> Option<i64> {
        match self {
            Self::TicketCreated { created_by, .. } => Some(*created_by),
            Self::TicketViewed { viewer_id, .. } => Some(*viewer_id),
            Self::TicketStatusChanged { changed_by, .. } => Some(*changed_by),
            Self::TicketAssigned { assigned_by, .. } => Some(*assigned_by),
            Self::PostCreated { author_id, .. } => Some(*author_id),
            Self::UserCreated { created_by, .. } => *created_by,
            Self::UserUpdated { updated_by, .. } => Some(*updated_by),
            Self::RecordReordered { reordered_by, .. } => Some(*reordered_by),
            Self::SettingsUpdated { updated_by, .. } => Some(*updated_by),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }
}

/// A stored audit event. `event_type`, `topic_id` and `actor_id` are
/// denormalized from `data` so they can be filtered on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventKind,
    pub topic_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub data: AuditEvent,
}
