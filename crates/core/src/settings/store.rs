use super::{SettingValue, SettingsMap};
use crate::error::DeskError;

/// Storage for site settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<SettingValue>, DeskError>;

    fn all(&self) -> Result<SettingsMap, DeskError>;

    /// Upsert every entry atomically. Any invalid key rejects the whole batch.
    fn set_many(&self, values: &SettingsMap) -> Result<(), DeskError>;

    /// Insert defaults for keys that have no value yet. Returns how many were added.
    fn ensure_defaults(&self, defaults: &SettingsMap) -> Result<usize, DeskError>;
}
