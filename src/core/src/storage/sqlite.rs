use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::SettingsStore;

/// SQLite-backed settings store.
///
/// Uses a `Mutex<Connection>` for thread-safe interior mutability.
/// The database is created/migrated on `open()`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a sqlite database at the given path.
    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| format!("sqlite open: {e}"))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("lock: {e}"))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS system_settings (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| format!("sqlite migrate: {e}"))?;
        Ok(())
    }
}

impl SettingsStore for SqliteStore {
    fn list_settings(&self) -> Result<BTreeMap<String, String>, String> {
        let conn = self.conn.lock().map_err(|e| format!("lock: {e}"))?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM system_settings ORDER BY key")
            .map_err(|e| format!("list settings: {e}"))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| format!("list settings: {e}"))?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| format!("list settings row: {e}"))?;
            out.insert(key, value);
        }
        Ok(out)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, String> {
        let conn = self.conn.lock().map_err(|e| format!("lock: {e}"))?;
        conn.query_row(
            "SELECT value FROM system_settings WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| format!("get setting: {e}"))
    }

    fn upsert_setting(&self, key: &str, value: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("lock: {e}"))?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO system_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .map_err(|e| format!("upsert setting: {e}"))?;
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("lock: {e}"))?;
        conn.execute("DELETE FROM system_settings WHERE key = ?1", params![key])
            .map_err(|e| format!("delete setting: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> SqliteStore {
        SqliteStore::open_memory().unwrap()
    }

    #[test]
    fn upsert_and_get_setting() {
        let store = make_store();
        store.upsert_setting("AI_PROVIDER", "local").unwrap();
        assert_eq!(
            store.get_setting("AI_PROVIDER").unwrap().as_deref(),
            Some("local")
        );
    }

    #[test]
    fn upsert_overwrites_on_conflict() {
        let store = make_store();
        store.upsert_setting("AI_PROVIDER", "local").unwrap();
        store.upsert_setting("AI_PROVIDER", "cloud").unwrap();
        assert_eq!(
            store.get_setting("AI_PROVIDER").unwrap().as_deref(),
            Some("cloud")
        );
        assert_eq!(store.list_settings().unwrap().len(), 1);
    }

    #[test]
    fn list_settings_returns_all_keys() {
        let store = make_store();
        store.upsert_setting("OPENAI_BASE_URL", "http://gpu:11434/v1").unwrap();
        store.upsert_setting("AI_PROVIDER", "local").unwrap();
        let all = store.list_settings().unwrap();
        let keys: Vec<_> = all.keys().map(String::as_str).collect();
        assert_eq!(keys, ["AI_PROVIDER", "OPENAI_BASE_URL"]);
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = make_store();
        assert!(store.get_setting("nope").unwrap().is_none());
    }

    #[test]
    fn delete_setting_is_idempotent() {
        let store = make_store();
        store.upsert_setting("OPENAI_API_KEY", "sk-test").unwrap();
        store.delete_setting("OPENAI_API_KEY").unwrap();
        store.delete_setting("OPENAI_API_KEY").unwrap();
        assert!(store.get_setting("OPENAI_API_KEY").unwrap().is_none());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repochat.db");
        SqliteStore::open(&path)
            .unwrap()
            .upsert_setting("AI_PROVIDER", "cloud")
            .unwrap();
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_setting("AI_PROVIDER").unwrap().as_deref(),
            Some("cloud")
        );
    }
}
