use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_core::audit::{create_audit_system, AuditEvent, AuditStore, SqliteAuditStore};
use helpdesk_core::config::BootstrapConfig;
use helpdesk_core::desk::{DeskStore, NewUser, SqliteDeskStore, UserRole};
use helpdesk_core::knowledge::SqliteKnowledgeStore;
use helpdesk_core::mailer::LogMailer;
use helpdesk_core::settings::{default_settings, SettingsStore, SqliteSettingsStore};
use helpdesk_core::{
    config_path, create_authenticator, load_config, validate_config, Authenticator, Desk,
};

use helpdesk_server::api::create_router;
use helpdesk_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = config_path();

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {}", config.auth.method.as_str());
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).context("Failed to serialize config")?;
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method().as_str());

    // All stores share one database file
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    let desk_store = Arc::new(
        SqliteDeskStore::new(&config.database.path).context("Failed to create desk store")?,
    );
    let knowledge_store = Arc::new(
        SqliteKnowledgeStore::new(&config.database.path)
            .context("Failed to create knowledge store")?,
    );
    let settings_store = Arc::new(
        SqliteSettingsStore::new(&config.database.path)
            .context("Failed to create settings store")?,
    );
    info!("Stores initialized");

    let inserted = settings_store
        .ensure_defaults(&default_settings())
        .context("Failed to write default settings")?;
    if inserted > 0 {
        info!("Wrote {} default settings", inserted);
    }

    if let Some(ref bootstrap) = config.bootstrap {
        bootstrap_admin(desk_store.as_ref(), bootstrap)?;
    }

    // Create audit system
    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .record(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let desk = Desk::new(
        desk_store,
        knowledge_store,
        settings_store,
        Arc::new(LogMailer::new()),
        config.mail.from.clone(),
    )
    .with_audit(audit_handle.clone());

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, authenticator, audit_store, desk));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    audit_handle
        .record(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The router (and the Desk's handle inside it) is gone once serve returns,
    // so dropping this last handle closes the writer's channel.
    drop(audit_handle);

    match writer_handle.await {
        Ok(stats) => info!(
            written = stats.written,
            failed = stats.failed,
            "Audit writer stopped"
        ),
        Err(e) => error!("Audit writer task failed: {}", e),
    }

    Ok(())
}

/// Create the configured admin unless an admin already exists.
fn bootstrap_admin(store: &dyn DeskStore, bootstrap: &BootstrapConfig) -> Result<()> {
    if let Some(admin) = store.first_admin().context("Failed to look up admins")? {
        info!(admin_id = admin.id, "Admin account present, skipping bootstrap");
        return Ok(());
    }

    match store
        .find_user_by_email(&bootstrap.admin_email)
        .context("Failed to look up bootstrap admin")?
    {
        Some(existing) => {
            warn!(
                user_id = existing.id,
                "Bootstrap email belongs to a non-admin user, leaving it unchanged"
            );
        }
        None => {
            let admin = store
                .create_user(NewUser {
                    name: bootstrap.admin_name.clone(),
                    email: bootstrap.admin_email.clone(),
                    role: UserRole::Admin,
                })
                .context("Failed to create bootstrap admin")?;
            info!(admin_id = admin.id, "Created bootstrap admin");
        }
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
