//! Database handle — migrations, seed rows, per-call connections with
//! bounded busy retry.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reelgate_core::error::{ReelgateError, Result};

/// Retry budget for transient lock contention: 5 attempts, doubling from
/// 100ms (100, 200, 400, 800 between attempts).
const BUSY_ATTEMPTS: u32 = 5;
const BUSY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Cheap, cloneable handle to the on-disk database. Holds only the path;
/// every operation opens a fresh connection.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open (creating parent directories as needed), run idempotent
    /// migrations, and seed default copy rows.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Self {
            path: path.to_path_buf(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run `f` on a fresh connection, retrying busy/locked errors with
    /// exponential backoff before surfacing `Storage`.
    pub(crate) fn with_conn<T>(
        &self,
        what: &str,
        f: impl Fn(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut delay = BUSY_BASE_DELAY;
        for attempt in 1..=BUSY_ATTEMPTS {
            match Connection::open(&self.path).and_then(|conn| f(&conn)) {
                Ok(value) => return Ok(value),
                Err(e) if is_contended(&e) && attempt < BUSY_ATTEMPTS => {
                    tracing::debug!("{what}: database busy (attempt {attempt}), retrying in {delay:?}");
                    std::thread::sleep(delay);
                    delay *= 2;
                }
                Err(e) => return Err(ReelgateError::Storage(format!("{what}: {e}"))),
            }
        }
        Err(ReelgateError::Storage(format!("{what}: retry budget exhausted")))
    }

    fn migrate(&self) -> Result<()> {
        self.with_conn("migrate", |conn| {
            conn.execute_batch(
                "
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                display_name TEXT,
                joined_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS films (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                image_ref TEXT
            );

            CREATE TABLE IF NOT EXISTS required_channels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL,
                link TEXT NOT NULL,
                channel_id TEXT
            );

            CREATE TABLE IF NOT EXISTS texts (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );

            CREATE TABLE IF NOT EXISTS broadcast_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                buttons TEXT,
                run_date TEXT NOT NULL,
                run_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
            )?;

            for (key, value) in DEFAULT_TEXTS {
                conn.execute(
                    "INSERT OR IGNORE INTO texts (key, value) VALUES (?1, ?2)",
                    rusqlite::params![key, value],
                )?;
            }
            for (key, value) in DEFAULT_SETTINGS {
                conn.execute(
                    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                    rusqlite::params![key, value],
                )?;
            }
            Ok(())
        })
    }
}

fn is_contended(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

/// Bot copy seeded on first start; editable at runtime via the text store.
const DEFAULT_TEXTS: &[(&str, &str)] = &[
    (
        "welcome",
        "🎬 Welcome! This bot serves the largest library of films and series, \
         indexed by code.\n\nSend the code you saw in a post or reel and get \
         the title right away.\n\n⚙️ How it works: <a href=\"{instruction_link}\">\
         search instructions</a>.\n\nEnjoy!",
    ),
    (
        "subscribe_required",
        "📝 To use the bot, subscribe to every channel below, then press the \
         check button.",
    ),
    ("not_found", "❌ No title with that code."),
    ("ad_text", "📢 For ad placement, contact the administrator."),
    ("search_prompt", "🔍 Send a title code to search:"),
    ("random_empty", "😔 The catalog is empty for now."),
];

const DEFAULT_SETTINGS: &[(&str, &str)] = &[("instruction_link", "https://t.me/reelgate_howto")];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_idempotent() {
        let path = std::env::temp_dir().join("reelgate-db-open-test.db");
        std::fs::remove_file(&path).ok();

        let first = Database::open(&path).unwrap();
        drop(first);
        // Re-opening re-runs migrations without clobbering anything.
        let db = Database::open(&path).unwrap();
        let value: String = db
            .with_conn("read seed", |conn| {
                conn.query_row("SELECT value FROM texts WHERE key = 'not_found'", [], |r| {
                    r.get(0)
                })
            })
            .unwrap();
        assert!(value.contains("No title"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn seeds_do_not_overwrite_edits() {
        let path = std::env::temp_dir().join("reelgate-db-seed-test.db");
        std::fs::remove_file(&path).ok();

        let db = Database::open(&path).unwrap();
        db.with_conn("edit", |conn| {
            conn.execute(
                "UPDATE texts SET value = 'custom' WHERE key = 'ad_text'",
                [],
            )
        })
        .unwrap();

        let db = Database::open(&path).unwrap();
        let value: String = db
            .with_conn("read", |conn| {
                conn.query_row("SELECT value FROM texts WHERE key = 'ad_text'", [], |r| {
                    r.get(0)
                })
            })
            .unwrap();
        assert_eq!(value, "custom");
        std::fs::remove_file(&path).ok();
    }
}
