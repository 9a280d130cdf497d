//! The `Desk` service: every admin action, composed from the stores, the
//! mailer and the audit log.

use std::sync::Arc;

use serde::Serialize;

use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::{resolve_agent, AuthError, Identity};
use crate::desk::{
    search, BatchOutcome, CreatedTicket, DeskStore, NewReply, NewTicket, NewUser, ReplyOutcome,
    SearchResults, StatusChange, StatusTransition, TicketView, Topic, TopicFilter, User,
    UserUpdate,
};
use crate::error::DeskError;
use crate::knowledge::{Category, Doc, KnowledgeStore, NewDoc, RankedKind};
use crate::mailer::{MailMessage, Mailer};
use crate::settings::{SettingsMap, SettingsStore, SEND_EMAIL_KEY};

/// What happened to the requester notification of a new ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Failed,
    /// `email.send_email` is off.
    Disabled,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Sent => "sent",
            NotificationOutcome::Failed => "failed",
            NotificationOutcome::Disabled => "disabled",
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }
}

#[derive(Debug, Clone)]
pub struct TicketCreation {
    pub created: CreatedTicket,
    pub notification: NotificationOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub topics: Vec<Topic>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub topics: Vec<Topic>,
}

pub struct Desk {
    store: Arc<dyn DeskStore>,
    knowledge: Arc<dyn KnowledgeStore>,
    settings: Arc<dyn SettingsStore>,
    mailer: Arc<dyn Mailer>,
    mail_from: String,
    audit: Option<AuditHandle>,
}

impl Desk {
    pub fn new(
        store: Arc<dyn DeskStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        settings: Arc<dyn SettingsStore>,
        mailer: Arc<dyn Mailer>,
        mail_from: impl Into<String>,
    ) -> Self {
        Self {
            store,
            knowledge,
            settings,
            mailer,
            mail_from: mail_from.into(),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &Arc<dyn DeskStore> {
        &self.store
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_record(event);
        }
    }

    fn emit_transition(&self, transition: &StatusTransition, actor: &User, reason: Option<&str>) {
        tracing::info!(
            topic_id = transition.topic_id,
            from = %transition.from,
            to = %transition.to,
            actor_id = actor.id,
            "Ticket status changed"
        );
        self.emit(AuditEvent::TicketStatusChanged {
            topic_id: transition.topic_id,
            from_status: transition.from,
            to_status: transition.to,
            changed_by: actor.id,
            reason: reason.map(String::from),
        });
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// The desk user an authenticated request acts as.
    pub fn resolve_actor(&self, identity: &Identity) -> Result<User, AuthError> {
        resolve_agent(self.store.as_ref(), &identity.acting_as)
    }

    /// Audit events lost because the queue was full or closed.
    pub fn audit_dropped(&self) -> u64 {
        self.audit.as_ref().map_or(0, AuditHandle::dropped)
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    pub fn list_tickets(&self, filter: &TopicFilter) -> Result<TicketPage, DeskError> {
        let topics = self.store.list_topics(filter)?;
        let total = self.store.count_topics(filter)?;
        tracing::debug!(count = topics.len(), total, "Listed tickets");
        Ok(TicketPage { topics, total })
    }

    pub fn view_ticket(&self, id: i64, viewer: &User) -> Result<TicketView, DeskError> {
        let view = self.store.view_topic(id, viewer)?;
        tracing::debug!(topic_id = id, viewer_id = viewer.id, "Viewed ticket");
        if viewer.is_agent() {
            self.emit(AuditEvent::TicketViewed {
                topic_id: id,
                viewer_id: viewer.id,
            });
        }
        if let Some(ref transition) = view.transition {
            self.emit_transition(transition, viewer, None);
        }
        Ok(view)
    }

    pub fn assign(
        &self,
        topic_ids: &[i64],
        agent_id: i64,
        actor: &User,
    ) -> Result<BatchOutcome, DeskError> {
        let outcome = self.store.assign(topic_ids, agent_id, actor)?;
        for topic in &outcome.topics {
            tracing::info!(topic_id = topic.id, agent_id, actor_id = actor.id, "Ticket assigned");
            self.emit(AuditEvent::TicketAssigned {
                topic_id: topic.id,
                assigned_user_id: agent_id,
                assigned_by: actor.id,
            });
        }
        Ok(outcome)
    }

    pub fn change_status(
        &self,
        topic_ids: &[i64],
        change: StatusChange,
        actor: &User,
    ) -> Result<BatchOutcome, DeskError> {
        let outcome = self.store.change_status(topic_ids, change, actor)?;
        for transition in &outcome.transitions {
            self.emit_transition(transition, actor, Some(change.as_str()));
        }
        Ok(outcome)
    }

    /// Open a ticket and notify the requester if `email.send_email` is on.
    ///
    /// A delivery failure is logged and reported; the ticket stays committed.
    pub async fn create_ticket(
        &self,
        ticket: NewTicket,
        actor: &User,
    ) -> Result<TicketCreation, DeskError> {
        let opened_by_requester = ticket.submitted_by_requester;
        let created = self.store.create_ticket(ticket, actor)?;
        tracing::info!(
            topic_id = created.topic.id,
            requester_id = created.user.id,
            status = %created.topic.current_status,
            user_created = created.user_created,
            "Ticket created"
        );

        if created.user_created {
            self.emit(AuditEvent::UserCreated {
                user_id: created.user.id,
                role: created.user.role,
                created_by: None,
            });
        }

        let enabled = self.notifications_enabled().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read notification setting, sending anyway");
            true
        });
        let notification = if enabled {
            let message =
                MailMessage::new_ticket(&self.mail_from, &created.user, &created.topic, &created.post);
            match self.mailer.deliver(message).await {
                Ok(()) => NotificationOutcome::Sent,
                Err(e) => {
                    tracing::warn!(
                        topic_id = created.topic.id,
                        mailer = self.mailer.name(),
                        error = %e,
                        "Failed to notify requester"
                    );
                    NotificationOutcome::Failed
                }
            }
        } else {
            tracing::debug!(topic_id = created.topic.id, "Notifications disabled");
            NotificationOutcome::Disabled
        };

        self.emit(AuditEvent::TicketCreated {
            topic_id: created.topic.id,
            requester_id: created.user.id,
            created_by: if opened_by_requester {
                created.user.id
            } else {
                actor.id
            },
            user_created: created.user_created,
            notification_sent: notification.is_sent(),
        });
        self.emit(AuditEvent::PostCreated {
            topic_id: created.topic.id,
            post_id: created.post.id,
            author_id: created.post.user_id,
            kind: created.post.kind,
        });

        Ok(TicketCreation {
            created,
            notification,
        })
    }

    pub fn reply(&self, reply: NewReply) -> Result<ReplyOutcome, DeskError> {
        let outcome = self.store.add_reply(reply)?;
        let author = self
            .store
            .get_user(outcome.post.user_id)?
            .ok_or_else(|| DeskError::not_found("User", outcome.post.user_id))?;

        tracing::info!(
            topic_id = outcome.topic.id,
            post_id = outcome.post.id,
            kind = outcome.post.kind.as_str(),
            "Post added"
        );
        self.emit(AuditEvent::PostCreated {
            topic_id: outcome.topic.id,
            post_id: outcome.post.id,
            author_id: author.id,
            kind: outcome.post.kind,
        });
        if let Some(ref audit_post) = outcome.audit_post {
            self.emit(AuditEvent::PostCreated {
                topic_id: audit_post.topic_id,
                post_id: audit_post.id,
                author_id: author.id,
                kind: audit_post.kind,
            });
        }
        if let Some(ref transition) = outcome.transition {
            self.emit_transition(transition, &author, None);
        }
        Ok(outcome)
    }

    pub fn search(&self, query: &str) -> Result<SearchResults, DeskError> {
        let results = search::dispatch(self.store.as_ref(), query)?;
        tracing::debug!(
            query,
            topics = results.topics.as_ref().map(Vec::len),
            user = results.user.is_some(),
            users = results.users.as_ref().map(Vec::len),
            "Search executed"
        );
        Ok(results)
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// A user and every ticket they requested.
    pub fn user_profile(&self, id: i64) -> Result<UserProfile, DeskError> {
        let user = self
            .store
            .get_user(id)?
            .ok_or_else(|| DeskError::not_found("User", id))?;
        let filter = TopicFilter::new().with_user(id).with_limit(i64::MAX);
        let topics = self.store.list_topics(&filter)?;
        Ok(UserProfile { user, topics })
    }

    pub fn create_user(&self, user: NewUser, actor: &User) -> Result<User, DeskError> {
        let created = self.store.create_user(user)?;
        tracing::info!(user_id = created.id, role = created.role.as_str(), "User created");
        self.emit(AuditEvent::UserCreated {
            user_id: created.id,
            role: created.role,
            created_by: Some(actor.id),
        });
        Ok(created)
    }

    pub fn update_user(&self, id: i64, update: UserUpdate, actor: &User) -> Result<User, DeskError> {
        let updated = self.store.update_user(id, update)?;
        tracing::info!(user_id = id, actor_id = actor.id, "User updated");
        self.emit(AuditEvent::UserUpdated {
            user_id: id,
            updated_by: actor.id,
        });
        Ok(updated)
    }

    // ========================================================================
    // Knowledge base
    // ========================================================================

    pub fn list_categories(&self) -> Result<Vec<Category>, DeskError> {
        self.knowledge.list_categories()
    }

    pub fn create_category(&self, name: &str) -> Result<Category, DeskError> {
        let category = self.knowledge.create_category(name)?;
        tracing::info!(category_id = category.id, rank = category.rank, "Category created");
        Ok(category)
    }

    pub fn list_docs(&self, category_id: i64) -> Result<Vec<Doc>, DeskError> {
        if self.knowledge.get_category(category_id)?.is_none() {
            return Err(DeskError::not_found("Category", category_id));
        }
        self.knowledge.list_docs(category_id)
    }

    pub fn create_doc(&self, doc: NewDoc) -> Result<Doc, DeskError> {
        let doc = self.knowledge.create_doc(doc)?;
        tracing::info!(doc_id = doc.id, category_id = doc.category_id, "Doc created");
        Ok(doc)
    }

    pub fn reorder(
        &self,
        kind: RankedKind,
        id: i64,
        position: i64,
        actor: &User,
    ) -> Result<Vec<i64>, DeskError> {
        let order = self.knowledge.reorder(kind, id, position)?;
        self.emit(AuditEvent::RecordReordered {
            object: kind.as_str().to_string(),
            record_id: id,
            position,
            reordered_by: actor.id,
        });
        Ok(order)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn settings(&self) -> Result<SettingsMap, DeskError> {
        self.settings.all()
    }

    pub fn update_settings(&self, values: &SettingsMap, actor: &User) -> Result<SettingsMap, DeskError> {
        if values.is_empty() {
            return Err(DeskError::validation("no settings given"));
        }
        self.settings.set_many(values)?;
        let keys: Vec<String> = values.keys().cloned().collect();
        tracing::info!(keys = ?keys, actor_id = actor.id, "Settings updated");
        self.emit(AuditEvent::SettingsUpdated {
            keys,
            updated_by: actor.id,
        });
        self.settings.all()
    }

    /// Requester notifications are on unless `email.send_email` says otherwise.
    pub fn notifications_enabled(&self) -> Result<bool, DeskError> {
        Ok(self
            .settings
            .get(SEND_EMAIL_KEY)?
            .map(|v| v.as_bool())
            .unwrap_or(true))
    }
}
