//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use helpdesk_core::desk::User;
use helpdesk_core::{AuthRequest, Identity};

use super::error::ApiError;
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that validates requests using the configured authenticator.
///
/// On success the resulting [`Identity`] is stored in the request extensions.
/// Missing or wrong credentials yield 401 Unauthorized.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    // Source IP defaults to localhost when the connection info is unavailable
    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match state.authenticator().authenticate(&auth_request).await {
        Ok(identity) => {
            let mut request = request;
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(e) => {
            AUTH_FAILURES_TOTAL.with_label_values(&[e.reason()]).inc();
            let status = ApiError::from(e).status;
            Err(status)
        }
    }
}

/// Extractor for the desk user a request acts as.
///
/// Resolves the [`Identity`] left by [`auth_middleware`] to an agent or admin.
/// Rejects with 401 outside the auth layer and 403 when the identity maps to
/// no agent.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = match parts.extensions.get::<Identity>() {
            Some(identity) => state.desk().resolve_actor(identity).map(Actor).map_err(|e| {
                AUTH_FAILURES_TOTAL.with_label_values(&[e.reason()]).inc();
                ApiError::from(e)
            }),
            None => Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "Authentication required",
            )),
        };
        std::future::ready(result)
    }
}
