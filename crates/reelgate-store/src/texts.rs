//! Bot copy and settings — two key-value tables behind one store.

use crate::db::Database;
use reelgate_core::error::Result;

#[derive(Debug, Clone)]
pub struct TextStore {
    db: Database,
}

impl TextStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Copy for `key`. Empty on miss or storage failure — callers render an
    /// empty string rather than crash over a hiccup.
    pub fn text(&self, key: &str) -> String {
        self.db
            .with_conn("read text", |conn| {
                conn.query_row(
                    "SELECT value FROM texts WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get::<_, String>(0),
                )
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(String::new()),
                    other => Err(other),
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("text {key:?} degraded to empty: {e}");
                String::new()
            })
    }

    pub fn set_text(&self, key: &str, value: &str) -> Result<()> {
        self.db.with_conn("set text", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO texts (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
        })?;
        Ok(())
    }

    pub fn text_keys(&self) -> Vec<String> {
        self.db
            .with_conn("list text keys", |conn| {
                let mut stmt = conn.prepare("SELECT key FROM texts ORDER BY key")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap_or_else(|e| {
                tracing::warn!("text key listing degraded to empty: {e}");
                Vec::new()
            })
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        self.db
            .with_conn("read setting", |conn| {
                conn.query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get::<_, Option<String>>(0),
                )
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("setting {key:?} degraded to none: {e}");
                None
            })
    }

    pub fn set_setting(&self, key: &str, value: Option<&str>) -> Result<()> {
        self.db.with_conn("set setting", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_round_trip() {
        let path = std::env::temp_dir().join("reelgate-texts-test.db");
        std::fs::remove_file(&path).ok();
        let texts = TextStore::new(Database::open(&path).unwrap());

        // Seeded default is present.
        assert!(!texts.text("not_found").is_empty());
        // Unknown key degrades to empty.
        assert_eq!(texts.text("no_such_key"), "");

        texts.set_text("ad_text", "write to @sales").unwrap();
        assert_eq!(texts.text("ad_text"), "write to @sales");

        assert_eq!(texts.setting("welcome_image"), None);
        texts.set_setting("welcome_image", Some("file-123")).unwrap();
        assert_eq!(texts.setting("welcome_image").as_deref(), Some("file-123"));
        texts.set_setting("welcome_image", None).unwrap();
        assert_eq!(texts.setting("welcome_image"), None);
        std::fs::remove_file(&path).ok();
    }
}
