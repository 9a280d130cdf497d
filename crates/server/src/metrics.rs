//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the help-desk server:
//! - HTTP request metrics (latency, counts, errors)
//! - Ticket status transitions and creations
//! - Requester notification outcomes
//! - Ticket counts by status and lost audit events (collected when scraped)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use regex_lite::Regex;

use helpdesk_core::desk::{StatusTransition, TicketStatus, TopicFilter};
use helpdesk_core::NotificationOutcome;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "helpdesk_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("helpdesk_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "helpdesk_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Ticket Metrics
// =============================================================================

/// Tickets by current status (collected dynamically).
pub static TICKETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("helpdesk_tickets_by_status", "Current ticket count by status"),
        &["status"],
    )
    .unwrap()
});

/// Ticket status transitions.
pub static TICKET_STATUS_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_ticket_status_transitions_total",
            "Ticket status transitions",
        ),
        &["from", "to"],
    )
    .unwrap()
});

/// Tickets created total.
pub static TICKETS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "helpdesk_tickets_created_total",
        "Total tickets created since startup",
    )
    .unwrap()
});

/// Requester notifications by result.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_notifications_total",
            "Requester notifications by result",
        ),
        &["result"],
    )
    .unwrap()
});

/// Audit events dropped because the queue was full or closed.
pub static AUDIT_EVENTS_DROPPED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "helpdesk_audit_events_dropped",
        "Audit events lost since startup",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Tickets
    registry
        .register(Box::new(TICKETS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(TICKET_STATUS_TRANSITIONS.clone()))
        .unwrap();
    registry
        .register(Box::new(TICKETS_CREATED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(NOTIFICATIONS_TOTAL.clone()))
        .unwrap();

    // Audit
    registry
        .register(Box::new(AUDIT_EVENTS_DROPPED.clone()))
        .unwrap();
}

/// Count committed status transitions.
pub fn record_transitions<'a>(transitions: impl IntoIterator<Item = &'a StatusTransition>) {
    for transition in transitions {
        TICKET_STATUS_TRANSITIONS
            .with_label_values(&[transition.from.as_str(), transition.to.as_str()])
            .inc();
    }
}

/// Count a created ticket and the outcome of its notification.
pub fn record_ticket_created(notification: NotificationOutcome) {
    TICKETS_CREATED_TOTAL.inc();
    NOTIFICATIONS_TOTAL
        .with_label_values(&[notification.as_str()])
        .inc();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the status gauges reflect the database.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let store = state.desk().store();
    for status in TicketStatus::ALL {
        let filter = TopicFilter::new().with_status(status);
        match store.count_topics(&filter) {
            Ok(count) => TICKETS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count),
            Err(e) => tracing::warn!(status = %status, error = %e, "Failed to count tickets"),
        }
    }
    AUDIT_EVENTS_DROPPED.set(i64::try_from(state.desk().audit_dropped()).unwrap_or(i64::MAX));
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Applied twice so adjacent numeric segments both collapse.
    let once = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    NUMERIC_SEGMENT.replace_all(&once, "/{id}$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/tickets/12345"), "/api/v1/tickets/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        assert_eq!(
            normalize_path("/api/v1/categories/3/docs"),
            "/api/v1/categories/{id}/docs"
        );
        assert_eq!(
            normalize_path("/api/v1/tickets/7/posts"),
            "/api/v1/tickets/{id}/posts"
        );
    }

    #[test]
    fn test_normalize_path_adjacent_ids() {
        assert_eq!(normalize_path("/a/1/2"), "/a/{id}/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/tickets/assign"), "/api/v1/tickets/assign");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("helpdesk_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_record_helpers() {
        record_transitions(&[StatusTransition {
            topic_id: 1,
            from: TicketStatus::Open,
            to: TicketStatus::Pending,
        }]);
        record_ticket_created(NotificationOutcome::Failed);
        TICKETS_BY_STATUS.with_label_values(&["open"]).set(0);

        let output = encode_metrics();
        assert!(output.contains("helpdesk_ticket_status_transitions_total"));
        assert!(output.contains("from=\"open\""));
        assert!(output.contains("helpdesk_tickets_created_total"));
        assert!(output.contains("helpdesk_notifications_total{result=\"failed\"}"));
        assert!(output.contains("helpdesk_tickets_by_status"));
    }
}
