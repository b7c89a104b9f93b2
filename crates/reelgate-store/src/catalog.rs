//! Code-indexed media catalog.

use rand::Rng;

use crate::db::Database;
use reelgate_core::error::{ReelgateError, Result};

/// One catalog row: a numeric code mapped to a display payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: String,
    pub title: String,
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new entry. Duplicate codes surface as `Storage` — the
    /// operator is told the command was not accepted.
    pub fn add(&self, code: &str, title: &str, image_ref: Option<&str>) -> Result<()> {
        self.db.with_conn("add catalog entry", |conn| {
            conn.execute(
                "INSERT INTO films (code, title, image_ref) VALUES (?1, ?2, ?3)",
                rusqlite::params![code, title, image_ref],
            )
        })?;
        Ok(())
    }

    pub fn remove(&self, code: &str) -> bool {
        self.db
            .with_conn("remove catalog entry", |conn| {
                conn.execute("DELETE FROM films WHERE code = ?1", rusqlite::params![code])
            })
            .map(|n| n > 0)
            .unwrap_or_else(|e| {
                tracing::warn!("catalog removal of {code:?} degraded to no-op: {e}");
                false
            })
    }

    pub fn find(&self, code: &str) -> Option<CatalogEntry> {
        self.db
            .with_conn("find catalog entry", |conn| {
                conn.query_row(
                    "SELECT code, title, image_ref FROM films WHERE code = ?1",
                    rusqlite::params![code],
                    row_to_entry,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("catalog lookup for {code:?} degraded to none: {e}");
                None
            })
    }

    pub fn all(&self) -> Vec<CatalogEntry> {
        self.db
            .with_conn("list catalog", |conn| {
                let mut stmt =
                    conn.prepare("SELECT code, title, image_ref FROM films ORDER BY code")?;
                let rows = stmt.query_map([], row_to_entry)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap_or_else(|e| {
                tracing::warn!("catalog listing degraded to empty: {e}");
                Vec::new()
            })
    }

    /// Uniformly random entry, if any.
    pub fn random(&self) -> Option<CatalogEntry> {
        self.db
            .with_conn("random catalog entry", |conn| {
                conn.query_row(
                    "SELECT code, title, image_ref FROM films ORDER BY RANDOM() LIMIT 1",
                    [],
                    row_to_entry,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("random pick degraded to none: {e}");
                None
            })
    }

    /// Pick a 4-digit code not yet taken.
    pub fn unique_code(&self) -> Result<String> {
        let taken: Vec<String> = self.db.with_conn("list catalog codes", |conn| {
            let mut stmt = conn.prepare("SELECT code FROM films")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        if taken.len() >= 9000 {
            return Err(ReelgateError::storage("4-digit code space exhausted"));
        }

        let mut rng = rand::thread_rng();
        loop {
            let code = rng.gen_range(1000..=9999).to_string();
            if !taken.contains(&code) {
                return Ok(code);
            }
        }
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        code: row.get(0)?,
        title: row.get(1)?,
        image_ref: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> (CatalogStore, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("reelgate-catalog-{name}.db"));
        std::fs::remove_file(&path).ok();
        let db = Database::open(&path).unwrap();
        (CatalogStore::new(db), path)
    }

    #[test]
    fn add_find_remove() {
        let (catalog, path) = store("crud");
        catalog.add("1234", "Spirited Away", None).unwrap();
        assert_eq!(catalog.find("1234").unwrap().title, "Spirited Away");
        assert!(catalog.find("9999").is_none());

        // Duplicate code is rejected.
        assert!(catalog.add("1234", "Another", None).is_err());

        assert!(catalog.remove("1234"));
        assert!(!catalog.remove("1234"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn random_on_empty_catalog() {
        let (catalog, path) = store("random");
        assert!(catalog.random().is_none());
        catalog.add("4321", "Alien", Some("file-id")).unwrap();
        assert_eq!(catalog.random().unwrap().code, "4321");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unique_code_avoids_taken() {
        let (catalog, path) = store("codes");
        catalog.add("1000", "x", None).unwrap();
        for _ in 0..20 {
            let code = catalog.unique_code().unwrap();
            assert_ne!(code, "1000");
            assert_eq!(code.len(), 4);
        }
        std::fs::remove_file(&path).ok();
    }
}
