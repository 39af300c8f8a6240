mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::BTreeMap;

/// Key-value persistence for dashboard settings.
///
/// All methods use `&self`; implementations handle interior mutability
/// (e.g. `Mutex<Connection>` for sqlite).
pub trait SettingsStore: Send + Sync + 'static {
    /// Every stored setting, keyed by name.
    fn list_settings(&self) -> Result<BTreeMap<String, String>, String>;

    /// One setting by key.
    fn get_setting(&self, key: &str) -> Result<Option<String>, String>;

    /// Insert or overwrite a setting.
    fn upsert_setting(&self, key: &str, value: &str) -> Result<(), String>;

    /// Remove a setting. Missing keys are not an error.
    fn delete_setting(&self, key: &str) -> Result<(), String>;
}
