//! Ticket status transition rules.
//!
//! Everything here is a pure function of the current ticket state and the
//! incoming action. The stores call into these while holding a transaction,
//! so the decision and the write always commit together.

use super::types::{StatusChange, TicketStatus, Topic, User, UserRole};
use crate::error::DeskError;

/// What an incoming post or admin action does to a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    /// Public reply.
    Reply,
    /// Agent-only note.
    InternalNote,
    /// Explicit status change, optionally alongside a reply.
    ChangeStatus(StatusChange),
}

/// Outcome of applying an action to a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: TicketStatus,
    /// Body of the audit note to append, if the action requires one.
    pub audit_note: Option<String>,
}

impl Transition {
    fn unchanged(status: TicketStatus) -> Self {
        Self {
            status,
            audit_note: None,
        }
    }
}

/// Status and viewed flag for a freshly opened ticket.
///
/// Tickets opened by an agent on a requester's behalf are already triaged.
/// Tickets a requester opens themselves start out `Open` and unviewed.
pub fn initial_status(opened_by: UserRole) -> (TicketStatus, bool) {
    if opened_by.is_agent() {
        (TicketStatus::Pending, true)
    } else {
        (TicketStatus::Open, false)
    }
}

/// Status change triggered by an agent opening a ticket.
///
/// Only the first view of a brand-new `Open` ticket moves it to `Pending`.
pub fn on_view(topic: &Topic) -> Option<TicketStatus> {
    if !topic.viewed && topic.current_status == TicketStatus::Open {
        Some(TicketStatus::Pending)
    } else {
        None
    }
}

/// Compute the next status for `action` performed by `actor`.
pub fn on_action(current: TicketStatus, actor: &User, action: TicketAction) -> Transition {
    match action {
        TicketAction::InternalNote => Transition::unchanged(current),
        TicketAction::Reply if actor.is_agent() => Transition::unchanged(TicketStatus::Open),
        TicketAction::Reply => match current {
            TicketStatus::Open | TicketStatus::Closed => {
                Transition::unchanged(TicketStatus::Pending)
            }
            TicketStatus::Pending | TicketStatus::Spam => Transition::unchanged(current),
        },
        TicketAction::ChangeStatus(change) => Transition {
            status: change.target(),
            audit_note: Some(status_change_note(change, actor)),
        },
    }
}

/// Audit note body for an explicit status change.
pub fn status_change_note(change: StatusChange, actor: &User) -> String {
    match change {
        StatusChange::Close => format!("This ticket has been closed by {}.", actor.name),
        StatusChange::Reopen => format!("This ticket has been reopened by {}.", actor.name),
        StatusChange::Spam => format!("This ticket has been marked as spam by {}.", actor.name),
    }
}

/// Audit note body for an assignment. Written on every assignment, including
/// reassignment to the agent who already holds the ticket.
pub fn assignment_note(agent: &User) -> String {
    format!("Discussion has been transferred to {}.", agent.name)
}

/// Pick the action for a post and check that the author may perform it.
pub fn classify_post(
    topic: &Topic,
    author: &User,
    internal: bool,
    change_status: Option<StatusChange>,
) -> Result<TicketAction, DeskError> {
    if author.is_agent() {
        return Ok(match (change_status, internal) {
            (Some(change), _) => TicketAction::ChangeStatus(change),
            (None, true) => TicketAction::InternalNote,
            (None, false) => TicketAction::Reply,
        });
    }

    if internal {
        return Err(DeskError::validation("only agents can post internal notes"));
    }
    if change_status.is_some() {
        return Err(DeskError::validation("only agents can change ticket status"));
    }
    if topic.user_id != author.id {
        return Err(DeskError::validation(format!(
            "user {} is not the requester of ticket {}",
            author.id, topic.id
        )));
    }
    Ok(TicketAction::Reply)
}
