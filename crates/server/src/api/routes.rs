use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{audit, handlers, knowledge, search, settings, tickets, users};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Authenticated API routes
    let api_routes = Router::new()
        // Config
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Tickets
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/tickets/assign", post(tickets::assign_tickets))
        .route("/tickets/status", post(tickets::update_status))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/posts", post(tickets::create_post))
        // Search
        .route("/search", get(search::search))
        // Users
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        // Knowledge base
        .route(
            "/categories",
            get(knowledge::list_categories).post(knowledge::create_category),
        )
        .route(
            "/categories/{id}/docs",
            get(knowledge::list_docs).post(knowledge::create_doc),
        )
        .route("/reorder", post(knowledge::reorder))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        // Health stays reachable without credentials
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
