use axum::{extract::State, Json};
use std::sync::Arc;

use helpdesk_core::settings::SettingsMap;

use super::error::ApiResult;
use super::middleware::Actor;
use crate::state::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<SettingsMap>> {
    Ok(Json(state.desk().settings()?))
}

/// Upsert every given key in one transaction and return the full map.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(values): Json<SettingsMap>,
) -> ApiResult<Json<SettingsMap>> {
    Ok(Json(state.desk().update_settings(&values, &actor)?))
}
