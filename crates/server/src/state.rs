use std::sync::Arc;

use helpdesk_core::audit::AuditStore;
use helpdesk_core::{Authenticator, Config, Desk, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit_store: Arc<dyn AuditStore>,
    desk: Desk,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit_store: Arc<dyn AuditStore>,
        desk: Desk,
    ) -> Self {
        Self {
            config,
            authenticator,
            audit_store,
            desk,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn desk(&self) -> &Desk {
        &self.desk
    }
}
