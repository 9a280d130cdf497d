//! Tickets (topics), their posts and the people on both sides of them.

pub mod search;
pub mod status;
mod sqlite_store;
mod store;
mod types;

pub use search::{SearchQuery, SearchResults, SEARCH_LIMIT};
pub use sqlite_store::SqliteDeskStore;
pub use store::{DeskStore, TopicFilter};
pub use types::{
    normalize_email, BatchOutcome, CreatedTicket, NewReply, NewTicket, NewUser, Post, PostKind,
    ReplyOutcome, StatusChange, StatusTransition, TicketStatus, TicketView, Topic, User, UserRole,
    UserUpdate,
};
