use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use helpdesk_core::audit::{AuditEventKind, AuditFilter, AuditRecord};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    /// Only this ticket's history
    pub topic_id: Option<i64>,
    /// Comma-separated event kinds, e.g. `ticket_viewed,post_created`
    pub event_type: Option<String>,
    /// Only events caused by this desk user
    pub actor_id: Option<i64>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit events
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Json<AuditQueryResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    // Base filter is shared between query and count
    let mut base_filter = AuditFilter::new().between(params.from, params.to);

    if let Some(topic_id) = params.topic_id {
        base_filter = base_filter.for_topic(topic_id);
    }

    if let Some(ref event_type) = params.event_type {
        base_filter = base_filter.of_kinds(parse_kinds(event_type)?);
    }

    if let Some(actor_id) = params.actor_id {
        base_filter = base_filter.by_actor(actor_id);
    }

    let query_filter = base_filter.clone().page(limit, offset);

    let events = state.audit_store().query(&query_filter)?;
    let total = state.audit_store().count(&base_filter)?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}

fn parse_kinds(list: &str) -> ApiResult<Vec<AuditEventKind>> {
    list.split(',')
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(|kind| kind.parse::<AuditEventKind>().map_err(ApiError::from))
        .collect()
}
