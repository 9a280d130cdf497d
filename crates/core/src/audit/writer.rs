use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditStore};

/// Upper bound on events written in one transaction.
const MAX_BATCH: usize = 64;

/// Totals reported by [`AuditWriter::run`] when the queue closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
    pub batches: u64,
}

/// Drains the audit queue into the store.
///
/// Whatever has queued up since the last write goes out as one batch, so a
/// burst of events (a bulk status change touching many tickets) costs one
/// SQLite transaction instead of one per event.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Run until every [`AuditHandle`] is dropped and the queue is empty.
    pub async fn run(mut self) -> WriterStats {
        tracing::info!("Audit writer started");
        let mut stats = WriterStats::default();
        let mut batch = Vec::with_capacity(MAX_BATCH);

        while self.rx.recv_many(&mut batch, MAX_BATCH).await > 0 {
            stats.batches += 1;
            match self.store.append(&batch) {
                Ok(written) => stats.written += written as u64,
                Err(e) => {
                    let first = batch[0].event.kind();
                    tracing::error!(
                        error = %e,
                        events = batch.len(),
                        first_kind = %first,
                        "Failed to write audit batch"
                    );
                    stats.failed += batch.len() as u64;
                }
            }
            batch.clear();
        }

        tracing::info!(
            written = stats.written,
            failed = stats.failed,
            batches = stats.batches,
            "Audit writer shutting down"
        );
        stats
    }
}

/// Build the queue, its sending handle and the writer that drains it.
///
/// Spawn the writer with `tokio::spawn(writer.run())`.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
