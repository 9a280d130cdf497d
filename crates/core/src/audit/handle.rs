use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::AuditEvent;

/// An event waiting in the queue, stamped with the time it happened rather
/// than the time it was written.
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEventEnvelope {
    pub fn now(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Sending side of the audit log. Clones share one queue and one drop counter.
///
/// Desk operations record through [`try_record`](Self::try_record), so a slow
/// or stopped writer can cost audit entries but never fails or stalls an
/// admin action.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
    dropped: Arc<AtomicU64>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event, waiting for room. For service start and stop, where
    /// losing the entry is worse than waiting.
    pub async fn record(&self, event: AuditEvent) {
        let kind = event.kind();
        if self.tx.send(AuditEventEnvelope::now(event)).await.is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::error!(kind = %kind, "Audit writer is gone, event lost");
        }
    }

    /// Queue an event without waiting. Returns false if it was dropped.
    pub fn try_record(&self, event: AuditEvent) -> bool {
        match self.tx.try_send(AuditEventEnvelope::now(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(envelope)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    kind = %envelope.event.kind(),
                    topic_id = ?envelope.event.topic_id(),
                    "Audit queue full, event dropped"
                );
                false
            }
            Err(TrySendError::Closed(envelope)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!(kind = %envelope.event.kind(), "Audit writer is gone, event lost");
                false
            }
        }
    }

    /// Events lost so far across all clones of this handle.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
