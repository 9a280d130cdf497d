//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the router with a seeded
//! database and a recording mailer, so the API can be exercised end to end
//! without binding a port.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use helpdesk_core::audit::{create_audit_system, AuditFilter, AuditStore, SqliteAuditStore};
use helpdesk_core::config::{AuthConfig, DatabaseConfig, MailConfig, ServerConfig};
use helpdesk_core::desk::SqliteDeskStore;
use helpdesk_core::knowledge::SqliteKnowledgeStore;
use helpdesk_core::settings::{default_settings, SettingsStore, SqliteSettingsStore};
use helpdesk_core::testing::MockMailer;
use helpdesk_core::{create_authenticator, AuthMethod, Config, Desk};

/// Re-export fixtures for test convenience
pub use helpdesk_core::testing::fixtures;

/// Test fixture with a seeded desk.
///
/// Seed data (see [`fixtures::seed_desk`]):
/// - user 1 "Admin User" (admin), 2 "Scott Smith", 3 "Scott Jones", 4 "Scott Green" (agent)
/// - topics 1 to 6 requested by Scott Smith, topic 7 by Scott Jones
/// - categories 1 to 4, docs 1 to 4 in category 1
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_ticket_list() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.get("/api/v1/tickets").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock mailer - inspect or fail deliveries
    pub mailer: MockMailer,
    /// Seeded users and topics
    pub seed: fixtures::SeededDesk,
    /// Audit store backing `/api/v1/audit`
    pub audit_store: Arc<dyn AuditStore>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require this API key on every request
    pub api_key: Option<String>,
    /// Act as this desk user instead of the first admin
    pub acting_user_email: Option<String>,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn acting_as(email: &str) -> Self {
        Self {
            acting_user_email: Some(email.to_string()),
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = AuthConfig {
            method: if test_config.api_key.is_some() {
                AuthMethod::ApiKey
            } else {
                AuthMethod::None
            },
            api_key: test_config.api_key.clone(),
            acting_user_email: test_config.acting_user_email.clone(),
        };
        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 8080, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            mail: MailConfig {
                from: "support@test.com".to_string(),
            },
            bootstrap: None,
        };

        // Create stores
        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(&db_path).expect("Failed to create audit store"));
        let desk_store =
            Arc::new(SqliteDeskStore::new(&db_path).expect("Failed to create desk store"));
        let knowledge_store = Arc::new(
            SqliteKnowledgeStore::new(&db_path).expect("Failed to create knowledge store"),
        );
        let settings_store = Arc::new(
            SqliteSettingsStore::new(&db_path).expect("Failed to create settings store"),
        );

        let seed = fixtures::seed_desk(desk_store.as_ref()).expect("Failed to seed desk");
        fixtures::seed_knowledge(knowledge_store.as_ref()).expect("Failed to seed knowledge");
        settings_store
            .ensure_defaults(&default_settings())
            .expect("Failed to seed settings");

        // Create audit system
        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let mailer = MockMailer::new();
        let desk = Desk::new(
            desk_store,
            knowledge_store,
            settings_store,
            Arc::new(mailer.clone()),
            config.mail.from.clone(),
        )
        .with_audit(audit_handle);

        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));
        let state = Arc::new(helpdesk_server::state::AppState::new(
            config,
            authenticator,
            Arc::clone(&audit_store),
            desk,
        ));

        let router = helpdesk_server::api::create_router(state);

        Self {
            router,
            mailer,
            seed,
            audit_store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), &[]).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, None, headers).await
    }

    /// Send a GET request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Poll the audit store until at least `count` events match `filter`.
    pub async fn wait_for_audit(&self, filter: &AuditFilter, count: i64) -> bool {
        for _ in 0..50 {
            if self.audit_store.count(filter).unwrap_or(0) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
