use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "HELPDESK_CONFIG";

const ENV_PREFIX: &str = "HELPDESK_";

/// The config file to load: `$HELPDESK_CONFIG`, else `config.toml`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Load the config file, then apply environment overrides.
///
/// A double underscore separates sections from keys, so key names may
/// contain single underscores: `HELPDESK_AUTH__ACTING_USER_EMAIL` sets
/// `[auth] acting_user_email` and `HELPDESK_SERVER__PORT` sets `[server] port`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
