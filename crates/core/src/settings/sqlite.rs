use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{validate_key, SettingValue, SettingsMap, SettingsStore};
use crate::error::DeskError;

/// SQLite-backed settings store. Values are stored as JSON text.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    pub fn new(path: &Path) -> Result<Self, DeskError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, DeskError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DeskError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

fn encode(value: &SettingValue) -> Result<String, DeskError> {
    serde_json::to_string(value).map_err(|e| DeskError::Database(e.to_string()))
}

fn decode(key: &str, raw: &str) -> Result<SettingValue, DeskError> {
    serde_json::from_str(raw)
        .map_err(|e| DeskError::Database(format!("corrupt setting {}: {}", key, e)))
}

impl SettingsStore for SqliteSettingsStore {
    fn get(&self, key: &str) -> Result<Option<SettingValue>, DeskError> {
        let conn = self.conn.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| decode(key, &raw)).transpose()
    }

    fn all(&self) -> Result<SettingsMap, DeskError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare("SELECT key, value FROM app_settings")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut settings = SettingsMap::new();
        for row in rows {
            let (key, raw) = row?;
            let value = decode(&key, &raw)?;
            settings.insert(key, value);
        }
        Ok(settings)
    }

    fn set_many(&self, values: &SettingsMap) -> Result<(), DeskError> {
        for key in values.keys() {
            validate_key(key)?;
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )?;
            for (key, value) in values {
                stmt.execute(params![key, encode(value)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn ensure_defaults(&self, defaults: &SettingsMap) -> Result<usize, DeskError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut added = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO app_settings (key, value) VALUES (?1, ?2)")?;
            for (key, value) in defaults {
                added += stmt.execute(params![key, encode(value)?])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }
}
