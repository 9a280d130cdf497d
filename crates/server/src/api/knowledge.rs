//! Knowledge-base handlers: categories, docs and drag-and-drop ordering.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use helpdesk_core::knowledge::{Category, Doc, NewDoc, RankedKind};

use super::error::ApiResult;
use super::middleware::Actor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocBody {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Body sent by the sortable lists in the admin UI.
#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    /// `doc` or `category`
    pub object: String,
    pub obj_id: i64,
    pub row_order_position: i64,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub object: RankedKind,
    /// Sibling ids in their new order.
    pub order: Vec<i64>,
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.desk().list_categories()?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCategoryBody>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.desk().create_category(&body.name)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_docs(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> ApiResult<Json<Vec<Doc>>> {
    Ok(Json(state.desk().list_docs(category_id)?))
}

pub async fn create_doc(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
    Json(body): Json<CreateDocBody>,
) -> ApiResult<(StatusCode, Json<Doc>)> {
    let doc = state.desk().create_doc(NewDoc {
        category_id,
        title: body.title,
        body: body.body,
    })?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Move a doc or category to a new position among its siblings
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(body): Json<ReorderBody>,
) -> ApiResult<Json<ReorderResponse>> {
    let kind: RankedKind = body.object.parse()?;
    let order = state
        .desk()
        .reorder(kind, body.obj_id, body.row_order_position, &actor)?;
    Ok(Json(ReorderResponse {
        object: kind,
        order,
    }))
}
