use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{reorder, Category, Doc, KnowledgeStore, NewDoc, RankedKind, ReorderError};
use crate::error::DeskError;

/// SQLite-backed knowledge-base store.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeStore {
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
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                rank INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS docs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                rank INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_docs_category_rank ON docs(category_id, rank);
            "#,
        )?;
        Ok(())
    }
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        rank: row.get(2)?,
    })
}

fn row_to_doc(row: &rusqlite::Row) -> rusqlite::Result<Doc> {
    Ok(Doc {
        id: row.get(0)?,
        category_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        rank: row.get(4)?,
    })
}

fn fetch_category(conn: &Connection, id: i64) -> Result<Option<Category>, DeskError> {
    Ok(conn
        .query_row(
            "SELECT id, name, rank FROM categories WHERE id = ?",
            params![id],
            row_to_category,
        )
        .optional()?)
}

fn sibling_ids(conn: &Connection, sql: &str, scope: &[&dyn rusqlite::ToSql]) -> Result<Vec<i64>, DeskError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(scope, |row| row.get(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn create_category(&self, name: &str) -> Result<Category, DeskError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DeskError::validation("category name cannot be empty"));
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let rank: i64 = tx.query_row(
            "SELECT COALESCE(MAX(rank) + 1, 0) FROM categories",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO categories (name, rank) VALUES (?, ?)",
            params![name, rank],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Category {
            id,
            name: name.to_string(),
            rank,
        })
    }

    fn get_category(&self, id: i64) -> Result<Option<Category>, DeskError> {
        let conn = self.conn.lock()?;
        fetch_category(&conn, id)
    }

    fn list_categories(&self) -> Result<Vec<Category>, DeskError> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, name, rank FROM categories ORDER BY rank ASC, id ASC")?;
        let rows = stmt.query_map([], row_to_category)?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    fn create_doc(&self, doc: NewDoc) -> Result<Doc, DeskError> {
        let title = doc.title.trim();
        if title.is_empty() {
            return Err(DeskError::validation("doc title cannot be empty"));
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if fetch_category(&tx, doc.category_id)?.is_none() {
            return Err(DeskError::not_found("Category", doc.category_id));
        }
        let rank: i64 = tx.query_row(
            "SELECT COALESCE(MAX(rank) + 1, 0) FROM docs WHERE category_id = ?",
            params![doc.category_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO docs (category_id, title, body, rank) VALUES (?, ?, ?, ?)",
            params![doc.category_id, title, doc.body, rank],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Doc {
            id,
            category_id: doc.category_id,
            title: title.to_string(),
            body: doc.body,
            rank,
        })
    }

    fn list_docs(&self, category_id: i64) -> Result<Vec<Doc>, DeskError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, category_id, title, body, rank FROM docs WHERE category_id = ? ORDER BY rank ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![category_id], row_to_doc)?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?);
        }
        Ok(docs)
    }

    fn reorder(&self, kind: RankedKind, id: i64, position: i64) -> Result<Vec<i64>, DeskError> {
        let position = usize::try_from(position)
            .map_err(|_| DeskError::validation(format!("position must be >= 0, got {}", position)))?;

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (siblings, update_sql) = match kind {
            RankedKind::Category => (
                sibling_ids(&tx, "SELECT id FROM categories ORDER BY rank ASC, id ASC", &[])?,
                "UPDATE categories SET rank = ? WHERE id = ?",
            ),
            RankedKind::Doc => {
                let category_id: i64 = tx
                    .query_row(
                        "SELECT category_id FROM docs WHERE id = ?",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| DeskError::not_found(kind.label(), id))?;
                (
                    sibling_ids(
                        &tx,
                        "SELECT id FROM docs WHERE category_id = ? ORDER BY rank ASC, id ASC",
                        &[&category_id],
                    )?,
                    "UPDATE docs SET rank = ? WHERE id = ?",
                )
            }
        };

        let ranks = reorder(&siblings, id, position).map_err(|e| match e {
            ReorderError::NotFound(missing) => DeskError::not_found(kind.label(), missing),
        })?;

        {
            let mut stmt = tx.prepare(update_sql)?;
            for (sibling, rank) in &ranks {
                stmt.execute(params![rank, sibling])?;
            }
        }
        tx.commit()?;

        tracing::info!(kind = %kind, id, position, "Reordered record");
        Ok(ranks.into_iter().map(|(id, _)| id).collect())
    }
}
