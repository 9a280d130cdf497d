//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use helpdesk_core::desk::{
    BatchOutcome, NewReply, NewTicket, Post, StatusChange, TicketStatus, Topic, TopicFilter, User,
};

use super::error::ApiResult;
use super::middleware::Actor;
use crate::metrics::{record_ticket_created, record_transitions};
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

/// Forum that admin-created tickets land in when none is given.
const DEFAULT_FORUM_ID: i64 = 1;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    /// Filter by status (`open`, `pending`, `closed`, `spam`)
    pub status: Option<String>,
    /// Filter by assigned agent
    pub assigned_user_id: Option<i64>,
    /// Filter by requester
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub topics: Vec<Topic>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct TicketViewResponse {
    pub topic: Topic,
    pub posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
pub struct RequesterBody {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

/// Request body for creating a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub requester: RequesterBody,
    pub subject: String,
    pub body: String,
    pub forum_id: Option<i64>,
    pub private: Option<bool>,
    /// Set when the requester opened the ticket themselves.
    #[serde(default)]
    pub submitted_by_requester: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub topic: Topic,
    pub post: Post,
    pub user: User,
    pub user_created: bool,
    pub notification_sent: bool,
}

/// Request body for adding a post
#[derive(Debug, Deserialize)]
pub struct ReplyBody {
    /// Defaults to the acting agent.
    pub author_id: Option<i64>,
    pub body: String,
    #[serde(default)]
    pub internal: bool,
    pub change_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub topic: Topic,
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_post: Option<Post>,
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub topic_ids: Vec<i64>,
    pub assigned_user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub topic_ids: Vec<i64>,
    pub change_status: String,
}

/// Response for bulk ticket actions
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub topics: Vec<Topic>,
    pub notes_created: usize,
}

impl From<BatchOutcome> for BatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            notes_created: outcome.audit_posts.len(),
            topics: outcome.topics,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List tickets with optional filters
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> ApiResult<Json<ListTicketsResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TopicFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        filter = filter.with_status(status.parse::<TicketStatus>()?);
    }

    if let Some(agent_id) = params.assigned_user_id {
        filter = filter.with_assigned_user(agent_id);
    }

    if let Some(user_id) = params.user_id {
        filter = filter.with_user(user_id);
    }

    let page = state.desk().list_tickets(&filter)?;

    Ok(Json(ListTicketsResponse {
        topics: page.topics,
        total: page.total,
        limit,
        offset,
    }))
}

/// Show a ticket with its posts, marking it viewed
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<TicketViewResponse>> {
    let view = state.desk().view_ticket(id, &actor)?;
    record_transitions(view.transition.iter());

    Ok(Json(TicketViewResponse {
        topic: view.topic,
        posts: view.posts,
    }))
}

/// Open a ticket on behalf of a requester
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(body): Json<CreateTicketBody>,
) -> ApiResult<(StatusCode, Json<CreateTicketResponse>)> {
    let ticket = NewTicket {
        requester_name: body.requester.name.unwrap_or_default(),
        requester_email: body.requester.email,
        subject: body.subject,
        body: body.body,
        forum_id: body.forum_id.unwrap_or(DEFAULT_FORUM_ID),
        private: body.private.unwrap_or(true),
        submitted_by_requester: body.submitted_by_requester,
    };

    let creation = state.desk().create_ticket(ticket, &actor).await?;
    record_ticket_created(creation.notification);

    let created = creation.created;
    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            topic: created.topic,
            post: created.post,
            user: created.user,
            user_created: created.user_created,
            notification_sent: creation.notification.is_sent(),
        }),
    ))
}

/// Add a reply or internal note, optionally changing the status
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<ReplyBody>,
) -> ApiResult<(StatusCode, Json<ReplyResponse>)> {
    let change_status = body
        .change_status
        .as_deref()
        .map(str::parse::<StatusChange>)
        .transpose()?;

    let outcome = state.desk().reply(NewReply {
        topic_id: id,
        author_id: body.author_id.unwrap_or(actor.id),
        body: body.body,
        internal: body.internal,
        change_status,
    })?;
    record_transitions(outcome.transition.iter());

    Ok((
        StatusCode::CREATED,
        Json(ReplyResponse {
            topic: outcome.topic,
            post: outcome.post,
            audit_post: outcome.audit_post,
        }),
    ))
}

/// Assign one or more tickets to an agent
pub async fn assign_tickets(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(body): Json<AssignBody>,
) -> ApiResult<Json<BatchResponse>> {
    let outcome = state
        .desk()
        .assign(&body.topic_ids, body.assigned_user_id, &actor)?;
    Ok(Json(BatchResponse::from(outcome)))
}

/// Close, reopen or mark one or more tickets as spam
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<BatchResponse>> {
    let change: StatusChange = body.change_status.parse()?;

    let outcome = state.desk().change_status(&body.topic_ids, change, &actor)?;
    record_transitions(&outcome.transitions);
    Ok(Json(BatchResponse::from(outcome)))
}
