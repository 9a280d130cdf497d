use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{AuditEventEnvelope, AuditEventKind, AuditRecord};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown audit event type: {0}")]
    UnknownEventType(String),
}

/// Which audit events to return.
///
/// Conditions combine with AND. An empty `kinds` list matches every kind.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    /// Only events in this ticket's history.
    pub topic_id: Option<i64>,
    /// Only events caused by this desk user.
    pub actor_id: Option<i64>,
    pub kinds: Vec<AuditEventKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditFilter {
    pub fn new() -> Self {
        Self {
            topic_id: None,
            actor_id: None,
            kinds: Vec::new(),
            from: None,
            to: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Everything that happened to one ticket: creation, views, replies,
    /// assignments and status changes.
    pub fn ticket_history(topic_id: i64) -> Self {
        Self::new()
            .for_topic(topic_id)
            .of_kinds(AuditEventKind::ALL.into_iter().filter(AuditEventKind::is_ticket_event))
    }

    pub fn for_topic(mut self, topic_id: i64) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    pub fn by_actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn of_kind(mut self, kind: AuditEventKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn of_kinds(self, kinds: impl IntoIterator<Item = AuditEventKind>) -> Self {
        kinds.into_iter().fold(self, Self::of_kind)
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// Persistent audit log.
pub trait AuditStore: Send + Sync {
    /// Append a batch of events atomically, returning how many were written.
    fn append(&self, batch: &[AuditEventEnvelope]) -> Result<usize, AuditError>;

    /// Matching records, newest first.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of matching records, ignoring `limit` and `offset`.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
