use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DeskError;

/// Namespaces a settings key may live in.
pub const SETTING_NAMESPACES: [&str; 7] =
    ["settings", "design", "css", "i18n", "widget", "email", "theme"];

/// Toggles requester notifications on ticket creation.
pub const SEND_EMAIL_KEY: &str = "email.send_email";

/// A setting is either a single string or a list of strings (e.g. locales).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    List(Vec<String>),
}

impl SettingValue {
    pub fn text(value: impl Into<String>) -> Self {
        SettingValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            SettingValue::List(_) => None,
        }
    }

    /// Interpret the value as a flag. `"false"`, `"0"`, `"off"`, `"no"`, `""` and an
    /// empty list are off; everything else is on.
    pub fn as_bool(&self) -> bool {
        match self {
            SettingValue::Text(s) => !matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "false" | "0" | "off" | "no" | ""
            ),
            SettingValue::List(items) => !items.is_empty(),
        }
    }
}

pub type SettingsMap = BTreeMap<String, SettingValue>;

/// Check that `key` is `namespace.name` with a known namespace.
pub fn validate_key(key: &str) -> Result<(), DeskError> {
    let (namespace, name) = key
        .split_once('.')
        .ok_or_else(|| DeskError::validation(format!("setting key must be namespace.name: {}", key)))?;

    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(DeskError::validation(format!("invalid setting name: {}", key)));
    }
    if !SETTING_NAMESPACES.contains(&namespace) {
        return Err(DeskError::validation(format!(
            "unknown settings namespace: {}",
            namespace
        )));
    }
    Ok(())
}

/// Values a fresh install starts with.
pub fn default_settings() -> SettingsMap {
    let mut defaults = SettingsMap::new();
    defaults.insert("settings.site_name".to_string(), SettingValue::text("Help Desk"));
    defaults.insert("settings.parent_site".to_string(), SettingValue::text(""));
    defaults.insert("settings.parent_company".to_string(), SettingValue::text(""));
    defaults.insert("settings.site_tagline".to_string(), SettingValue::text("Support"));
    defaults.insert(
        "i18n.available_locales".to_string(),
        SettingValue::List(vec!["en".to_string()]),
    );
    defaults.insert("widget.show_on_support_site".to_string(), SettingValue::text("0"));
    defaults.insert(SEND_EMAIL_KEY.to_string(), SettingValue::text("true"));
    defaults
}
