use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use super::{
    AuditError, AuditEvent, AuditEventEnvelope, AuditEventKind, AuditFilter, AuditRecord,
    AuditStore,
};

fn db_err(e: impl std::fmt::Display) -> AuditError {
    AuditError::Database(e.to_string())
}

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open the audit log, creating the file and table if needed.
    ///
    /// The audit table can live in the same file as the desk tables.
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AuditError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(db_err)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                topic_id INTEGER,
                actor_id INTEGER,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_topic_id ON audit_events(topic_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
            CREATE INDEX IF NOT EXISTS idx_audit_events_actor_id ON audit_events(actor_id);
            "#,
        )
        .map_err(db_err)
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(topic_id) = filter.topic_id {
            conditions.push("topic_id = ?".to_string());
            params.push(Box::new(topic_id));
        }

        if !filter.kinds.is_empty() {
            let placeholders = vec!["?"; filter.kinds.len()].join(", ");
            conditions.push(format!("event_type IN ({})", placeholders));
            for kind in &filter.kinds {
                params.push(Box::new(kind.as_str()));
            }
        }

        if let Some(actor_id) = filter.actor_id {
            conditions.push("actor_id = ?".to_string());
            params.push(Box::new(actor_id));
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?".to_string());
            params.push(Box::new(from.to_rfc3339()));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?".to_string());
            params.push(Box::new(to.to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, batch: &[AuditEventEnvelope]) -> Result<usize, AuditError> {
        let mut conn = self.conn.lock().map_err(db_err)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO audit_events (timestamp, event_type, topic_id, actor_id, data) VALUES (?, ?, ?, ?, ?)",
                )
                .map_err(db_err)?;

            for envelope in batch {
                let event = &envelope.event;
                let data_json = serde_json::to_string(event)
                    .map_err(|e| AuditError::Serialization(e.to_string()))?;
                stmt.execute(params![
                    envelope.timestamp.to_rfc3339(),
                    event.kind().as_str(),
                    event.topic_id(),
                    event.actor_id(),
                    data_json,
                ])
                .map_err(db_err)?;
            }
        }

        tx.commit().map_err(db_err)?;
        Ok(batch.len())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.conn.lock().map_err(db_err)?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, timestamp, event_type, topic_id, actor_id, data FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let timestamp_str: String = row.get(1)?;
                let event_type: String = row.get(2)?;
                let topic_id: Option<i64> = row.get(3)?;
                let actor_id: Option<i64> = row.get(4)?;
                let data_json: String = row.get(5)?;

                Ok((id, timestamp_str, event_type, topic_id, actor_id, data_json))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp_str, event_type, topic_id, actor_id, data_json) =
                row_result.map_err(db_err)?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            let event_type: AuditEventKind = event_type.parse()?;

            let data: AuditEvent = serde_json::from_str(&data_json)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                topic_id,
                actor_id,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.conn.lock().map_err(db_err)?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }
}
