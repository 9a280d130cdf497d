//! User profile handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use helpdesk_core::desk::{NewUser, User, UserRole, UserUpdate};
use helpdesk_core::service::UserProfile;

use super::error::ApiResult;
use super::middleware::Actor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub name: String,
    pub email: String,
    /// `admin`, `agent` or `user` (default)
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

fn parse_role(role: Option<&str>) -> ApiResult<Option<UserRole>> {
    Ok(role.map(str::parse::<UserRole>).transpose()?)
}

/// A user and every ticket they requested
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.desk().user_profile(id)?))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let role = parse_role(body.role.as_deref())?.unwrap_or(UserRole::User);
    let user = state.desk().create_user(
        NewUser {
            name: body.name,
            email: body.email,
            role,
        },
        &actor,
    )?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<Json<User>> {
    let update = UserUpdate {
        name: body.name,
        email: body.email,
        role: parse_role(body.role.as_deref())?,
    };
    Ok(Json(state.desk().update_user(id, update, &actor)?))
}
