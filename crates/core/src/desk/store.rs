//! Repository interface for tickets, posts and users.

use super::types::{
    BatchOutcome, CreatedTicket, NewReply, NewTicket, NewUser, Post, ReplyOutcome, StatusChange,
    TicketStatus, TicketView, Topic, User, UserUpdate,
};
use crate::error::DeskError;

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    pub status: Option<TicketStatus>,
    pub assigned_user_id: Option<i64>,
    /// Filter by requester.
    pub user_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl TopicFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_assigned_user(mut self, user_id: i64) -> Self {
        self.assigned_user_id = Some(user_id);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Storage for the ticketing side of the desk.
///
/// Every mutating method is atomic: either all rows it touches (including
/// audit posts) are committed, or none are.
pub trait DeskStore: Send + Sync {
    // ---- users ----

    fn create_user(&self, user: NewUser) -> Result<User, DeskError>;

    fn get_user(&self, id: i64) -> Result<Option<User>, DeskError>;

    /// Case-insensitive lookup.
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DeskError>;

    fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, DeskError>;

    /// Lowest-id admin, used as the acting user when auth carries no identity.
    fn first_admin(&self) -> Result<Option<User>, DeskError>;

    /// Users whose name equals `name`, ignoring case.
    fn users_named(&self, name: &str) -> Result<Vec<User>, DeskError>;

    /// Users whose name or email contains `fragment`, ignoring case.
    fn users_matching(&self, fragment: &str) -> Result<Vec<User>, DeskError>;

    fn count_users(&self) -> Result<i64, DeskError>;

    // ---- topics ----

    /// Open a ticket, creating the requester if their email is unseen.
    fn create_ticket(&self, ticket: NewTicket, actor: &User) -> Result<CreatedTicket, DeskError>;

    fn get_topic(&self, id: i64) -> Result<Option<Topic>, DeskError>;

    fn list_topics(&self, filter: &TopicFilter) -> Result<Vec<Topic>, DeskError>;

    fn count_topics(&self, filter: &TopicFilter) -> Result<i64, DeskError>;

    /// Topics whose subject or any post body contains `text`.
    fn search_topics(&self, text: &str, limit: i64) -> Result<Vec<Topic>, DeskError>;

    /// Load a ticket for an agent, applying the first-view transition.
    fn view_topic(&self, id: i64, viewer: &User) -> Result<TicketView, DeskError>;

    /// Assign every listed topic to `agent_id`, one audit post per topic.
    fn assign(&self, topic_ids: &[i64], agent_id: i64, actor: &User)
        -> Result<BatchOutcome, DeskError>;

    /// Apply an explicit status change to every listed topic.
    fn change_status(
        &self,
        topic_ids: &[i64],
        change: StatusChange,
        actor: &User,
    ) -> Result<BatchOutcome, DeskError>;

    // ---- posts ----

    fn add_reply(&self, reply: NewReply) -> Result<ReplyOutcome, DeskError>;

    /// Posts of a topic, oldest first.
    fn posts_for(&self, topic_id: i64) -> Result<Vec<Post>, DeskError>;

    fn count_posts(&self) -> Result<i64, DeskError>;
}
