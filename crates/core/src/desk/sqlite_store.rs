//! SQLite-backed desk store implementation.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::status::{self, TicketAction};
use super::types::{
    normalize_email, BatchOutcome, CreatedTicket, NewReply, NewTicket, NewUser, Post, PostKind,
    ReplyOutcome, StatusChange, StatusTransition, TicketStatus, TicketView, Topic, User, UserRole,
    UserUpdate,
};
use super::{DeskStore, TopicFilter};
use crate::error::DeskError;

const USER_COLUMNS: &str = "id, name, email, role, created_at";
const TOPIC_COLUMNS: &str = "id, subject, user_id, forum_id, current_status, assigned_user_id, private, viewed, created_at, updated_at";
const POST_COLUMNS: &str = "id, topic_id, user_id, body, kind, created_at";

/// SQLite-backed desk store.
pub struct SqliteDeskStore {
    conn: Mutex<Connection>,
}

impl SqliteDeskStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, DeskError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
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
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                -- Unicode-lowercased name; SQLite's lower() and LIKE only fold ASCII
                name_key TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_name_key ON users(name_key);

            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id),
                forum_id INTEGER NOT NULL,
                current_status TEXT NOT NULL
                    CHECK (current_status IN ('open', 'pending', 'closed', 'spam')),
                assigned_user_id INTEGER REFERENCES users(id),
                private INTEGER NOT NULL DEFAULT 1,
                viewed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL REFERENCES topics(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                body TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_topics_status ON topics(current_status);
            CREATE INDEX IF NOT EXISTS idx_topics_user_id ON topics(user_id);
            CREATE INDEX IF NOT EXISTS idx_topics_assigned ON topics(assigned_user_id);
            CREATE INDEX IF NOT EXISTS idx_topics_updated_at ON topics(updated_at);
            CREATE INDEX IF NOT EXISTS idx_posts_topic_id ON posts(topic_id);
            "#,
        )?;
        Ok(())
    }

    fn build_where_clause(filter: &TopicFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("current_status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(assigned) = filter.assigned_user_id {
            conditions.push("assigned_user_id = ?");
            params.push(Box::new(assigned));
        }

        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_enum<T: FromStr<Err = DeskError>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: parse_enum(row, 3)?,
        created_at: parse_timestamp(row, 4)?,
    })
}

fn row_to_topic(row: &rusqlite::Row) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        subject: row.get(1)?,
        user_id: row.get(2)?,
        forum_id: row.get(3)?,
        current_status: parse_enum(row, 4)?,
        assigned_user_id: row.get(5)?,
        private: row.get(6)?,
        viewed: row.get(7)?,
        created_at: parse_timestamp(row, 8)?,
        updated_at: parse_timestamp(row, 9)?,
    })
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        user_id: row.get(2)?,
        body: row.get(3)?,
        kind: parse_enum(row, 4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

// ============================================================================
// Connection-level helpers (usable inside a transaction)
// ============================================================================

fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>, DeskError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_user).optional()?)
}

fn require_user(conn: &Connection, id: i64) -> Result<User, DeskError> {
    fetch_user(conn, id)?.ok_or_else(|| DeskError::not_found("User", id))
}

fn fetch_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DeskError> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![email.to_lowercase()], row_to_user)
        .optional()?)
}

fn insert_user(
    conn: &Connection,
    name: &str,
    email: &str,
    role: UserRole,
    now: DateTime<Utc>,
) -> Result<User, DeskError> {
    conn.execute(
        "INSERT INTO users (name, name_key, email, role, created_at) VALUES (?, ?, ?, ?, ?)",
        params![name, name.to_lowercase(), email, role.as_str(), now.to_rfc3339()],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at: now,
    })
}

fn fetch_topic(conn: &Connection, id: i64) -> Result<Option<Topic>, DeskError> {
    let sql = format!("SELECT {} FROM topics WHERE id = ?", TOPIC_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_topic).optional()?)
}

fn require_topic(conn: &Connection, id: i64) -> Result<Topic, DeskError> {
    fetch_topic(conn, id)?.ok_or_else(|| DeskError::not_found("Topic", id))
}

fn insert_post(
    conn: &Connection,
    topic_id: i64,
    user_id: i64,
    body: &str,
    kind: PostKind,
    now: DateTime<Utc>,
) -> Result<Post, DeskError> {
    conn.execute(
        "INSERT INTO posts (topic_id, user_id, body, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        params![topic_id, user_id, body, kind.as_str(), now.to_rfc3339()],
    )?;
    Ok(Post {
        id: conn.last_insert_rowid(),
        topic_id,
        user_id,
        body: body.to_string(),
        kind,
        created_at: now,
    })
}

fn write_status(
    conn: &Connection,
    topic_id: i64,
    status: TicketStatus,
    now: DateTime<Utc>,
) -> Result<(), DeskError> {
    conn.execute(
        "UPDATE topics SET current_status = ?, updated_at = ? WHERE id = ?",
        params![status.as_str(), now.to_rfc3339(), topic_id],
    )?;
    Ok(())
}

fn load_posts(conn: &Connection, topic_id: i64) -> Result<Vec<Post>, DeskError> {
    let sql = format!(
        "SELECT {} FROM posts WHERE topic_id = ? ORDER BY id ASC",
        POST_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![topic_id], row_to_post)?;
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

fn query_users(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<User>, DeskError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_user)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Deduplicate ids while keeping request order. An empty batch is invalid.
fn distinct_ids(ids: &[i64]) -> Result<Vec<i64>, DeskError> {
    if ids.is_empty() {
        return Err(DeskError::validation("at least one topic id is required"));
    }
    let mut seen = HashSet::new();
    Ok(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn require_agent(actor: &User) -> Result<(), DeskError> {
    if actor.is_agent() {
        Ok(())
    } else {
        Err(DeskError::Forbidden(format!(
            "user {} is not an agent",
            actor.id
        )))
    }
}

// ============================================================================
// Store implementation
// ============================================================================

impl DeskStore for SqliteDeskStore {
    fn create_user(&self, user: NewUser) -> Result<User, DeskError> {
        let email = normalize_email(&user.email)?;
        let name = user.name.trim();
        if name.is_empty() {
            return Err(DeskError::validation("user name cannot be empty"));
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if fetch_user_by_email(&tx, &email)?.is_some() {
            return Err(DeskError::validation(format!(
                "email already registered: {}",
                email
            )));
        }
        let created = insert_user(&tx, name, &email, user.role, Utc::now())?;
        tx.commit()?;
        Ok(created)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, DeskError> {
        let conn = self.conn.lock()?;
        fetch_user(&conn, id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DeskError> {
        let conn = self.conn.lock()?;
        fetch_user_by_email(&conn, email.trim())
    }

    fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, DeskError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut user = require_user(&tx, id)?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DeskError::validation("user name cannot be empty"));
            }
            user.name = name.to_string();
        }

        if let Some(email) = update.email {
            let email = normalize_email(&email)?;
            if let Some(other) = fetch_user_by_email(&tx, &email)? {
                if other.id != id {
                    return Err(DeskError::validation(format!(
                        "email already registered: {}",
                        email
                    )));
                }
            }
            user.email = email;
        }

        if let Some(role) = update.role {
            user.role = role;
        }

        tx.execute(
            "UPDATE users SET name = ?, name_key = ?, email = ?, role = ? WHERE id = ?",
            params![
                user.name,
                user.name.to_lowercase(),
                user.email,
                user.role.as_str(),
                id
            ],
        )?;
        tx.commit()?;
        Ok(user)
    }

    fn first_admin(&self) -> Result<Option<User>, DeskError> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT {} FROM users WHERE role = 'admin' ORDER BY id ASC LIMIT 1",
            USER_COLUMNS
        );
        Ok(conn.query_row(&sql, [], row_to_user).optional()?)
    }

    fn users_named(&self, name: &str) -> Result<Vec<User>, DeskError> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT {} FROM users WHERE name_key = ? ORDER BY id ASC",
            USER_COLUMNS
        );
        let name = name.trim().to_lowercase();
        query_users(&conn, &sql, &[&name as &dyn rusqlite::ToSql])
    }

    fn users_matching(&self, fragment: &str) -> Result<Vec<User>, DeskError> {
        let conn = self.conn.lock()?;
        let pattern = like_pattern(&fragment.trim().to_lowercase());
        let sql = format!(
            "SELECT {} FROM users WHERE name_key LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\' ORDER BY id ASC",
            USER_COLUMNS
        );
        query_users(&conn, &sql, &[&pattern as &dyn rusqlite::ToSql])
    }

    fn count_users(&self) -> Result<i64, DeskError> {
        let conn = self.conn.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    fn create_ticket(&self, ticket: NewTicket, actor: &User) -> Result<CreatedTicket, DeskError> {
        let email = normalize_email(&ticket.requester_email)?;
        let subject = ticket.subject.trim();
        if subject.is_empty() {
            return Err(DeskError::validation("ticket subject cannot be empty"));
        }
        if ticket.body.trim().is_empty() {
            return Err(DeskError::validation("ticket body cannot be empty"));
        }
        if !ticket.submitted_by_requester {
            require_agent(actor)?;
        }

        let now = Utc::now();
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (user, user_created) = match fetch_user_by_email(&tx, &email)? {
            Some(existing) => (existing, false),
            None => {
                let name = match ticket.requester_name.trim() {
                    "" => email.split('@').next().unwrap_or(&email).to_string(),
                    name => name.to_string(),
                };
                (insert_user(&tx, &name, &email, UserRole::User, now)?, true)
            }
        };

        let opener_role = if ticket.submitted_by_requester {
            user.role
        } else {
            actor.role
        };
        let (current_status, viewed) = status::initial_status(opener_role);

        tx.execute(
            "INSERT INTO topics (subject, user_id, forum_id, current_status, assigned_user_id, private, viewed, created_at, updated_at) VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?)",
            params![
                subject,
                user.id,
                ticket.forum_id,
                current_status.as_str(),
                ticket.private,
                viewed,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        let topic_id = tx.last_insert_rowid();
        let post = insert_post(&tx, topic_id, user.id, &ticket.body, PostKind::Initial, now)?;
        tx.commit()?;

        Ok(CreatedTicket {
            topic: Topic {
                id: topic_id,
                subject: subject.to_string(),
                user_id: user.id,
                forum_id: ticket.forum_id,
                current_status,
                assigned_user_id: None,
                private: ticket.private,
                viewed,
                created_at: now,
                updated_at: now,
            },
            post,
            user,
            user_created,
        })
    }

    fn get_topic(&self, id: i64) -> Result<Option<Topic>, DeskError> {
        let conn = self.conn.lock()?;
        fetch_topic(&conn, id)
    }

    fn list_topics(&self, filter: &TopicFilter) -> Result<Vec<Topic>, DeskError> {
        let conn = self.conn.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM topics {} ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
            TOPIC_COLUMNS, where_clause
        );

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), row_to_topic)?;

        let mut topics = Vec::new();
        for row in rows {
            topics.push(row?);
        }
        Ok(topics)
    }

    fn count_topics(&self, filter: &TopicFilter) -> Result<i64, DeskError> {
        let conn = self.conn.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM topics {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        Ok(conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?)
    }

    fn search_topics(&self, text: &str, limit: i64) -> Result<Vec<Topic>, DeskError> {
        let conn = self.conn.lock()?;
        let pattern = like_pattern(text.trim());
        let sql = format!(
            "SELECT {} FROM topics WHERE subject LIKE ?1 ESCAPE '\\' OR id IN (SELECT topic_id FROM posts WHERE body LIKE ?1 ESCAPE '\\') ORDER BY updated_at DESC, id DESC LIMIT ?2",
            TOPIC_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, limit], row_to_topic)?;
        let mut topics = Vec::new();
        for row in rows {
            topics.push(row?);
        }
        Ok(topics)
    }

    fn view_topic(&self, id: i64, viewer: &User) -> Result<TicketView, DeskError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut topic = require_topic(&tx, id)?;
        let mut transition = None;

        if viewer.is_agent() {
            if let Some(next) = status::on_view(&topic) {
                let now = Utc::now();
                write_status(&tx, id, next, now)?;
                transition = Some(StatusTransition {
                    topic_id: id,
                    from: topic.current_status,
                    to: next,
                });
                topic.current_status = next;
                topic.updated_at = now;
            }
            if !topic.viewed {
                tx.execute("UPDATE topics SET viewed = 1 WHERE id = ?", params![id])?;
                topic.viewed = true;
            }
        }

        let mut posts = load_posts(&tx, id)?;
        if !viewer.is_agent() {
            posts.retain(|p| !p.is_internal());
        }
        tx.commit()?;

        Ok(TicketView {
            topic,
            posts,
            transition,
        })
    }

    fn assign(
        &self,
        topic_ids: &[i64],
        agent_id: i64,
        actor: &User,
    ) -> Result<BatchOutcome, DeskError> {
        require_agent(actor)?;
        let ids = distinct_ids(topic_ids)?;
        let now = Utc::now();

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let agent = require_user(&tx, agent_id)?;
        if !agent.is_agent() {
            return Err(DeskError::validation(format!(
                "user {} cannot be assigned tickets",
                agent.id
            )));
        }
        let note = status::assignment_note(&agent);

        let mut outcome = BatchOutcome::default();
        for id in ids {
            let mut topic = require_topic(&tx, id)?;
            tx.execute(
                "UPDATE topics SET assigned_user_id = ?, updated_at = ? WHERE id = ?",
                params![agent.id, now.to_rfc3339(), id],
            )?;
            outcome
                .audit_posts
                .push(insert_post(&tx, id, actor.id, &note, PostKind::Audit, now)?);
            topic.assigned_user_id = Some(agent.id);
            topic.updated_at = now;
            outcome.topics.push(topic);
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn change_status(
        &self,
        topic_ids: &[i64],
        change: StatusChange,
        actor: &User,
    ) -> Result<BatchOutcome, DeskError> {
        require_agent(actor)?;
        let ids = distinct_ids(topic_ids)?;
        let now = Utc::now();

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut outcome = BatchOutcome::default();
        for id in ids {
            let mut topic = require_topic(&tx, id)?;
            let transition = status::on_action(
                topic.current_status,
                actor,
                TicketAction::ChangeStatus(change),
            );

            write_status(&tx, id, transition.status, now)?;
            if let Some(note) = transition.audit_note {
                outcome
                    .audit_posts
                    .push(insert_post(&tx, id, actor.id, &note, PostKind::Audit, now)?);
            }
            if transition.status != topic.current_status {
                outcome.transitions.push(StatusTransition {
                    topic_id: id,
                    from: topic.current_status,
                    to: transition.status,
                });
            }
            topic.current_status = transition.status;
            topic.updated_at = now;
            outcome.topics.push(topic);
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn add_reply(&self, reply: NewReply) -> Result<ReplyOutcome, DeskError> {
        if reply.body.trim().is_empty() {
            return Err(DeskError::validation("reply body cannot be empty"));
        }
        let now = Utc::now();

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut topic = require_topic(&tx, reply.topic_id)?;
        let author = require_user(&tx, reply.author_id)?;
        let action = status::classify_post(&topic, &author, reply.internal, reply.change_status)?;
        let transition = status::on_action(topic.current_status, &author, action);

        let kind = if reply.internal {
            PostKind::Note
        } else {
            PostKind::Reply
        };
        let post = insert_post(&tx, topic.id, author.id, &reply.body, kind, now)?;
        let audit_post = transition
            .audit_note
            .as_deref()
            .map(|note| insert_post(&tx, topic.id, author.id, note, PostKind::Audit, now))
            .transpose()?;

        write_status(&tx, topic.id, transition.status, now)?;
        tx.commit()?;

        let committed = (transition.status != topic.current_status).then_some(StatusTransition {
            topic_id: topic.id,
            from: topic.current_status,
            to: transition.status,
        });
        topic.current_status = transition.status;
        topic.updated_at = now;

        Ok(ReplyOutcome {
            topic,
            post,
            audit_post,
            transition: committed,
        })
    }

    fn posts_for(&self, topic_id: i64) -> Result<Vec<Post>, DeskError> {
        let conn = self.conn.lock()?;
        load_posts(&conn, topic_id)
    }

    fn count_posts(&self) -> Result<i64, DeskError> {
        let conn = self.conn.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteDeskStore {
        SqliteDeskStore::in_memory().unwrap()
    }

    fn admin(store: &SqliteDeskStore) -> User {
        store
            .create_user(NewUser {
                name: "Admin User".to_string(),
                email: "admin@test.com".to_string(),
                role: UserRole::Admin,
            })
            .unwrap()
    }

    fn agent(store: &SqliteDeskStore, name: &str, email: &str) -> User {
        store
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                role: UserRole::Agent,
            })
            .unwrap()
    }

    fn new_ticket(email: &str) -> NewTicket {
        NewTicket {
            requester_name: "A User".to_string(),
            requester_email: email.to_string(),
            subject: "Cannot log in".to_string(),
            body: "The login page spins forever".to_string(),
            forum_id: 1,
            private: true,
            submitted_by_requester: false,
        }
    }

    fn requester_ticket(store: &SqliteDeskStore, actor: &User, email: &str) -> CreatedTicket {
        let mut ticket = new_ticket(email);
        ticket.submitted_by_requester = true;
        store.create_ticket(ticket, actor).unwrap()
    }

    #[test]
    fn test_create_ticket_for_new_user() {
        let store = create_test_store();
        let admin = admin(&store);

        let created = store.create_ticket(new_ticket("anon@test.com"), &admin).unwrap();

        assert!(created.user_created);
        assert_eq!(created.user.email, "anon@test.com");
        assert_eq!(created.user.role, UserRole::User);
        assert_eq!(created.topic.user_id, created.user.id);
        assert_eq!(created.topic.current_status, TicketStatus::Pending);
        assert!(created.topic.viewed);
        assert_eq!(created.post.kind, PostKind::Initial);
        assert_eq!(store.count_users().unwrap(), 2);
        assert_eq!(store.count_posts().unwrap(), 1);
    }

    #[test]
    fn test_create_ticket_for_existing_user_matches_email_case_insensitively() {
        let store = create_test_store();
        let admin = admin(&store);
        store.create_ticket(new_ticket("scott@test.com"), &admin).unwrap();

        let created = store.create_ticket(new_ticket("Scott@Test.com"), &admin).unwrap();

        assert!(!created.user_created);
        assert_eq!(store.count_users().unwrap(), 2);
        assert_eq!(store.count_topics(&TopicFilter::new()).unwrap(), 2);
    }

    #[test]
    fn test_requester_opened_ticket_starts_open_and_unviewed() {
        let store = create_test_store();
        let admin = admin(&store);

        let created = requester_ticket(&store, &admin, "new@test.com");

        assert_eq!(created.topic.current_status, TicketStatus::Open);
        assert!(!created.topic.viewed);
    }

    #[test]
    fn test_create_ticket_rejects_bad_input() {
        let store = create_test_store();
        let admin = admin(&store);

        let result = store.create_ticket(new_ticket("nope"), &admin);
        assert!(matches!(result, Err(DeskError::Validation(_))));

        let mut empty_body = new_ticket("ok@test.com");
        empty_body.body = "   ".to_string();
        let result = store.create_ticket(empty_body, &admin);
        assert!(matches!(result, Err(DeskError::Validation(_))));

        assert_eq!(store.count_topics(&TopicFilter::new()).unwrap(), 0);
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn test_first_view_moves_new_ticket_to_pending() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = requester_ticket(&store, &admin, "new@test.com");

        let view = store.view_topic(created.topic.id, &admin).unwrap();
        assert_eq!(view.topic.current_status, TicketStatus::Pending);
        assert!(view.topic.viewed);
        assert_eq!(view.transition.unwrap().from, TicketStatus::Open);

        let reloaded = store.get_topic(created.topic.id).unwrap().unwrap();
        assert_eq!(reloaded.current_status, TicketStatus::Pending);

        // Second view is a no-op.
        let again = store.view_topic(created.topic.id, &admin).unwrap();
        assert!(again.transition.is_none());
    }

    #[test]
    fn test_requester_view_hides_internal_posts_and_keeps_status() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = requester_ticket(&store, &admin, "new@test.com");
        store
            .add_reply(NewReply {
                topic_id: created.topic.id,
                author_id: admin.id,
                body: "customer seems upset".to_string(),
                internal: true,
                change_status: None,
            })
            .unwrap();

        let view = store.view_topic(created.topic.id, &created.user).unwrap();

        assert_eq!(view.topic.current_status, TicketStatus::Open);
        assert!(!view.topic.viewed);
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].kind, PostKind::Initial);
    }

    #[test]
    fn test_view_missing_topic() {
        let store = create_test_store();
        let admin = admin(&store);
        let result = store.view_topic(999, &admin);
        assert!(matches!(result, Err(DeskError::NotFound { .. })));
    }

    #[test]
    fn test_assign_creates_one_note_per_topic() {
        let store = create_test_store();
        let admin = admin(&store);
        let first = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        let second = store.create_ticket(new_ticket("b@test.com"), &admin).unwrap();
        let before = store.count_posts().unwrap();

        let outcome = store
            .assign(&[first.topic.id, second.topic.id], admin.id, &admin)
            .unwrap();

        assert_eq!(outcome.audit_posts.len(), 2);
        assert_eq!(store.count_posts().unwrap(), before + 2);
        for topic in &outcome.topics {
            assert_eq!(topic.assigned_user_id, Some(admin.id));
        }
        assert!(outcome.audit_posts.iter().all(|p| p.kind == PostKind::Audit));
    }

    #[test]
    fn test_reassigning_same_agent_still_notes() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();

        store.assign(&[created.topic.id], admin.id, &admin).unwrap();
        let before = store.count_posts().unwrap();
        let outcome = store.assign(&[created.topic.id], admin.id, &admin).unwrap();

        assert_eq!(outcome.audit_posts.len(), 1);
        assert_eq!(store.count_posts().unwrap(), before + 1);
    }

    #[test]
    fn test_assign_does_not_change_status() {
        let store = create_test_store();
        let admin = admin(&store);
        let other = agent(&store, "Other Agent", "other@test.com");
        let created = requester_ticket(&store, &admin, "a@test.com");

        let outcome = store.assign(&[created.topic.id], other.id, &admin).unwrap();

        assert_eq!(outcome.topics[0].current_status, TicketStatus::Open);
        assert!(outcome.transitions.is_empty());
        assert!(outcome.audit_posts[0].body.contains("Other Agent"));
    }

    #[test]
    fn test_assign_is_all_or_nothing() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        let before = store.count_posts().unwrap();

        let result = store.assign(&[created.topic.id, 404], admin.id, &admin);

        assert!(matches!(result, Err(DeskError::NotFound { .. })));
        assert_eq!(store.count_posts().unwrap(), before);
        let topic = store.get_topic(created.topic.id).unwrap().unwrap();
        assert_eq!(topic.assigned_user_id, None);
    }

    #[test]
    fn test_assign_to_end_user_is_rejected() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();

        let result = store.assign(&[created.topic.id], created.user.id, &admin);
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[test]
    fn test_assign_deduplicates_ids() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();

        let outcome = store
            .assign(&[created.topic.id, created.topic.id], admin.id, &admin)
            .unwrap();
        assert_eq!(outcome.audit_posts.len(), 1);
    }

    #[test]
    fn test_change_status_batch() {
        let store = create_test_store();
        let admin = admin(&store);
        let first = requester_ticket(&store, &admin, "a@test.com");
        let second = store.create_ticket(new_ticket("b@test.com"), &admin).unwrap();
        let before = store.count_posts().unwrap();

        let outcome = store
            .change_status(&[first.topic.id, second.topic.id], StatusChange::Close, &admin)
            .unwrap();

        assert_eq!(store.count_posts().unwrap(), before + 2);
        assert_eq!(outcome.transitions.len(), 2);
        for topic in &outcome.topics {
            assert_eq!(topic.current_status, TicketStatus::Closed);
            let stored = store.get_topic(topic.id).unwrap().unwrap();
            assert_eq!(stored.current_status, TicketStatus::Closed);
        }
    }

    #[test]
    fn test_change_status_reopen_and_spam() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        let id = created.topic.id;

        store.change_status(&[id], StatusChange::Close, &admin).unwrap();
        let reopened = store.change_status(&[id], StatusChange::Reopen, &admin).unwrap();
        assert_eq!(reopened.topics[0].current_status, TicketStatus::Open);

        let spammed = store.change_status(&[id], StatusChange::Spam, &admin).unwrap();
        assert_eq!(spammed.topics[0].current_status, TicketStatus::Spam);
    }

    #[test]
    fn test_change_status_requires_agent() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();

        let result = store.change_status(&[created.topic.id], StatusChange::Close, &created.user);
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
    }

    #[test]
    fn test_change_status_empty_batch() {
        let store = create_test_store();
        let admin = admin(&store);
        let result = store.change_status(&[], StatusChange::Close, &admin);
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[test]
    fn test_requester_reply_sets_pending() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        store
            .change_status(&[created.topic.id], StatusChange::Close, &admin)
            .unwrap();

        let outcome = store
            .add_reply(NewReply {
                topic_id: created.topic.id,
                author_id: created.user.id,
                body: "still broken".to_string(),
                internal: false,
                change_status: None,
            })
            .unwrap();

        assert_eq!(outcome.topic.current_status, TicketStatus::Pending);
        assert_eq!(outcome.post.kind, PostKind::Reply);
        assert!(outcome.audit_post.is_none());
    }

    #[test]
    fn test_admin_reply_sets_open() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        assert_eq!(created.topic.current_status, TicketStatus::Pending);

        let outcome = store
            .add_reply(NewReply {
                topic_id: created.topic.id,
                author_id: admin.id,
                body: "have you tried turning it off and on again".to_string(),
                internal: false,
                change_status: None,
            })
            .unwrap();

        assert_eq!(outcome.topic.current_status, TicketStatus::Open);
        let transition = outcome.transition.unwrap();
        assert_eq!(transition.from, TicketStatus::Pending);
        assert_eq!(transition.to, TicketStatus::Open);
    }

    #[test]
    fn test_internal_note_keeps_status() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();

        let outcome = store
            .add_reply(NewReply {
                topic_id: created.topic.id,
                author_id: admin.id,
                body: "escalating to tier 2".to_string(),
                internal: true,
                change_status: None,
            })
            .unwrap();

        assert_eq!(outcome.topic.current_status, TicketStatus::Pending);
        assert_eq!(outcome.post.kind, PostKind::Note);
        assert!(outcome.transition.is_none());
    }

    #[test]
    fn test_reply_with_status_change_adds_audit_note() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        let before = store.count_posts().unwrap();

        let outcome = store
            .add_reply(NewReply {
                topic_id: created.topic.id,
                author_id: admin.id,
                body: "fixed, closing".to_string(),
                internal: false,
                change_status: Some(StatusChange::Close),
            })
            .unwrap();

        assert_eq!(outcome.topic.current_status, TicketStatus::Closed);
        assert!(outcome.audit_post.is_some());
        assert_eq!(store.count_posts().unwrap(), before + 2);
    }

    #[test]
    fn test_reply_validation() {
        let store = create_test_store();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        let before = store.count_posts().unwrap();

        let empty = store.add_reply(NewReply {
            topic_id: created.topic.id,
            author_id: admin.id,
            body: "".to_string(),
            internal: false,
            change_status: None,
        });
        assert!(matches!(empty, Err(DeskError::Validation(_))));

        let user_note = store.add_reply(NewReply {
            topic_id: created.topic.id,
            author_id: created.user.id,
            body: "secret".to_string(),
            internal: true,
            change_status: None,
        });
        assert!(matches!(user_note, Err(DeskError::Validation(_))));

        let missing = store.add_reply(NewReply {
            topic_id: 404,
            author_id: admin.id,
            body: "hello".to_string(),
            internal: false,
            change_status: None,
        });
        assert!(matches!(missing, Err(DeskError::NotFound { .. })));

        assert_eq!(store.count_posts().unwrap(), before);
    }

    #[test]
    fn test_list_with_status_filter_and_pagination() {
        let store = create_test_store();
        let admin = admin(&store);
        for i in 0..3 {
            store
                .create_ticket(new_ticket(&format!("p{}@test.com", i)), &admin)
                .unwrap();
        }
        requester_ticket(&store, &admin, "o@test.com");

        let pending = store
            .list_topics(&TopicFilter::new().with_status(TicketStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 3);

        let open = store
            .count_topics(&TopicFilter::new().with_status(TicketStatus::Open))
            .unwrap();
        assert_eq!(open, 1);

        let page = store
            .list_topics(&TopicFilter::new().with_limit(2).with_offset(2))
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_list_by_assignee_and_requester() {
        let store = create_test_store();
        let admin = admin(&store);
        let first = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        store.create_ticket(new_ticket("b@test.com"), &admin).unwrap();
        store.assign(&[first.topic.id], admin.id, &admin).unwrap();

        let mine = store
            .list_topics(&TopicFilter::new().with_assigned_user(admin.id))
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.topic.id);

        let theirs = store
            .list_topics(&TopicFilter::new().with_user(first.user.id))
            .unwrap();
        assert_eq!(theirs.len(), 1);
    }

    #[test]
    fn test_search_topics_by_subject_and_body() {
        let store = create_test_store();
        let admin = admin(&store);
        let mut ticket = new_ticket("a@test.com");
        ticket.subject = "Pending private topic".to_string();
        store.create_ticket(ticket, &admin).unwrap();
        let mut other = new_ticket("b@test.com");
        other.body = "my invoice shows 100% markup".to_string();
        store.create_ticket(other, &admin).unwrap();

        assert_eq!(store.search_topics("private topic", 50).unwrap().len(), 1);
        assert_eq!(store.search_topics("INVOICE", 50).unwrap().len(), 1);
        assert_eq!(store.search_topics("100%", 50).unwrap().len(), 1);
        assert_eq!(store.search_topics("50%", 50).unwrap().len(), 0);
    }

    #[test]
    fn test_user_name_lookups() {
        let store = create_test_store();
        admin(&store);
        agent(&store, "Scott Smith", "scott.smith@test.com");
        agent(&store, "Scott Jones", "sjones@test.com");

        assert_eq!(store.users_named("admin user").unwrap().len(), 1);
        assert_eq!(store.users_matching("scott").unwrap().len(), 2);
        assert_eq!(store.users_matching("SJONES").unwrap().len(), 1);
        assert!(store.users_named("scott").unwrap().is_empty());
    }

    #[test]
    fn test_update_user() {
        let store = create_test_store();
        let admin = admin(&store);
        let other = agent(&store, "Agent", "agent@test.com");

        let updated = store
            .update_user(
                other.id,
                UserUpdate {
                    name: Some("Renamed".to_string()),
                    email: Some("Renamed@Test.com".to_string()),
                    role: Some(UserRole::Admin),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "renamed@test.com");
        assert_eq!(updated.role, UserRole::Admin);

        store
            .update_user(
                other.id,
                UserUpdate {
                    name: Some("Ångström".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.users_named("ÅNGSTRÖM").unwrap().len(), 1);
        assert_eq!(store.users_matching("ångs").unwrap().len(), 1);
        assert!(store.users_matching("renamed user").unwrap().is_empty());

        let clash = store.update_user(
            other.id,
            UserUpdate {
                email: Some(admin.email.clone()),
                ..Default::default()
            },
        );
        assert!(matches!(clash, Err(DeskError::Validation(_))));
    }

    #[test]
    fn test_duplicate_user_email_rejected() {
        let store = create_test_store();
        admin(&store);
        let result = store.create_user(NewUser {
            name: "Another".to_string(),
            email: "ADMIN@test.com".to_string(),
            role: UserRole::User,
        });
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[test]
    fn test_first_admin() {
        let store = create_test_store();
        assert!(store.first_admin().unwrap().is_none());
        agent(&store, "Agent", "agent@test.com");
        let admin = admin(&store);
        assert_eq!(store.first_admin().unwrap().unwrap().id, admin.id);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a%b_c"), "%a\\%b\\_c%");
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("desk.db");

        let store = SqliteDeskStore::new(&db_path).unwrap();
        let admin = admin(&store);
        let created = store.create_ticket(new_ticket("a@test.com"), &admin).unwrap();
        drop(store);

        assert!(db_path.exists());
        let reopened = SqliteDeskStore::new(&db_path).unwrap();
        assert!(reopened.get_topic(created.topic.id).unwrap().is_some());
    }

    #[test]
    fn test_concurrent_writers_on_shared_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("desk.db");
        let first = std::sync::Arc::new(SqliteDeskStore::new(&path).unwrap());
        let second = std::sync::Arc::new(SqliteDeskStore::new(&path).unwrap());

        let handles: Vec<_> = [("a", first), ("b", second)]
            .into_iter()
            .map(|(prefix, store)| {
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .create_user(NewUser {
                                name: format!("User {}{}", prefix, i),
                                email: format!("{}{}@test.com", prefix, i),
                                role: UserRole::User,
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store = SqliteDeskStore::new(&path).unwrap();
        assert_eq!(store.count_users().unwrap(), 50);
    }
}
