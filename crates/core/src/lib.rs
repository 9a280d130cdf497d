pub mod audit;
pub mod auth;
pub mod config;
pub mod desk;
pub mod error;
pub mod knowledge;
pub mod mailer;
pub mod service;
pub mod settings;
pub mod testing;

pub use auth::{
    create_authenticator, resolve_agent, ActingAs, AuthError, AuthRequest, Authenticator,
    Identity,
};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use error::DeskError;
pub use service::{Desk, NotificationOutcome, TicketCreation};
