use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use helpdesk_core::desk::SearchResults;

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Admin search box. Returns at most one of `topics`, `user` or `users`.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResults>> {
    Ok(Json(state.desk().search(&params.q)?))
}
