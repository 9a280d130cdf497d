use super::{types::Config, AuthMethod, ConfigError};
use crate::desk::normalize_email;

fn check_email(field: &str, email: &str) -> Result<(), ConfigError> {
    normalize_email(email).map(|_| ()).map_err(|_| {
        ConfigError::ValidationError(format!("{} is not an email address: {}", field, email))
    })
}

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - Server port is not 0
/// - An API key is present when the api_key method is selected
/// - Configured email addresses are accepted by the desk's email check
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if let Some(email) = &config.auth.acting_user_email {
        check_email("auth.acting_user_email", email)?;
    }

    if let Some(bootstrap) = &config.bootstrap {
        if bootstrap.admin_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bootstrap.admin_name cannot be empty".to_string(),
            ));
        }
        check_email("bootstrap.admin_email", &bootstrap.admin_email)?;
    }

    Ok(())
}
