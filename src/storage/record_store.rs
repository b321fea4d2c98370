//! Durable record store
//!
//! One fixed key in a SQLite key/value table holds the trimmed,
//! newest-first JSON array of completed records. Durability is
//! best-effort; callers treat every failure here as non-fatal.

use crate::models::RequestRecord;
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STORAGE_KEY: &str = "inspector.requests";

pub struct RecordStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl RecordStore {
    pub fn new(base_path: &Path) -> anyhow::Result<Self> {
        if !base_path.exists() {
            fs::create_dir_all(base_path)
                .with_context(|| format!("creating storage directory {:?}", base_path))?;
        }
        let db_path = base_path.join("storefront_inspector.sqlite");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("opening database at {:?}", db_path))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Overwrite the persisted record array.
    pub fn save(&self, records: &[RequestRecord]) -> anyhow::Result<()> {
        let payload = serde_json::to_string(records)?;
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![STORAGE_KEY, payload],
        )
        .context("persisting request records")?;
        Ok(())
    }

    /// Load the persisted record array; empty when nothing was saved.
    pub fn load(&self) -> anyhow::Result<Vec<RequestRecord>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        let payload: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("loading request records")?;
        match payload {
            Some(json) => serde_json::from_str(&json).context("decoding request records"),
            None => Ok(Vec::new()),
        }
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute("DELETE FROM kv WHERE key = ?1", params![STORAGE_KEY])
            .context("clearing request records")?;
        Ok(())
    }

    #[allow(dead_code)]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, RequestCategory, RequestRecord};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn record(url: &str) -> RequestRecord {
        RequestRecord::pending(
            HttpMethod::Get,
            &format!("https://shop.example{}", url),
            url,
            url,
            RequestCategory::CartRead,
            HashMap::new(),
            None,
            None,
        )
    }

    #[test]
    fn save_load_roundtrip_preserves_order() {
        let dir = tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path()).expect("store opens");

        let records = vec![record("/cart.js"), record("/products/a.js")];
        store.save(&records).expect("save ok");

        let loaded = store.load().expect("load ok");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, records[0].id);
        assert_eq!(loaded[1].url, "/products/a.js");
    }

    #[test]
    fn load_is_empty_before_any_save() {
        let dir = tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path()).expect("store opens");
        assert!(store.load().expect("load ok").is_empty());
    }

    #[test]
    fn clear_removes_the_key() {
        let dir = tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path()).expect("store opens");
        store.save(&[record("/cart.js")]).expect("save ok");
        store.clear().expect("clear ok");
        assert!(store.load().expect("load ok").is_empty());
    }

    #[test]
    fn save_overwrites_previous_array() {
        let dir = tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path()).expect("store opens");
        store.save(&[record("/cart.js"), record("/cart.js")]).expect("save ok");
        store.save(&[record("/localization")]).expect("save ok");

        let loaded = store.load().expect("load ok");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].url, "/localization");
    }
}
