//! User directory — append on first contact, update in place afterwards.
//! The core never deletes users; the scheduler only reads the id list.

use crate::db::Database;

/// Audience counters for the operator dashboard, computed in the reference
/// timezone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: u64,
    pub today: u64,
    pub week: u64,
    pub month: u64,
}

#[derive(Debug, Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a contact from `user_id`. First contact inserts with the join
    /// timestamp; later contacts only refresh the display name.
    pub fn record_contact(&self, user_id: i64, display_name: Option<&str>) {
        let outcome = self.db.with_conn("record contact", |conn| {
            conn.execute(
                "INSERT INTO users (user_id, display_name, joined_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name",
                rusqlite::params![user_id, display_name],
            )
        });
        if let Err(e) = outcome {
            tracing::warn!("failed to record contact for {user_id}: {e}");
        }
    }

    /// Full recipient snapshot for fan-out. Empty on storage failure — the
    /// caller cannot tell a degraded store from an empty one.
    pub fn all_ids(&self) -> Vec<i64> {
        self.db
            .with_conn("list user ids", |conn| {
                let mut stmt = conn.prepare("SELECT user_id FROM users")?;
                let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap_or_else(|e| {
                tracing::warn!("user id listing degraded to empty: {e}");
                Vec::new()
            })
    }

    /// Join-rate counters. `offset_hours` shifts the stored UTC timestamps
    /// into the reference timezone before bucketing by day.
    pub fn stats(&self, offset_hours: i32) -> UserStats {
        let shift = format!("{offset_hours:+} hours");
        self.db
            .with_conn("user stats", |conn| {
                let count = |sql: &str| -> rusqlite::Result<u64> {
                    conn.query_row(sql, rusqlite::params![&shift], |row| row.get::<_, i64>(0))
                        .map(|n| n as u64)
                };
                Ok(UserStats {
                    total: conn
                        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))?
                        as u64,
                    today: count(
                        "SELECT COUNT(*) FROM users
                         WHERE date(joined_at, ?1) = date('now', ?1)",
                    )?,
                    week: count(
                        "SELECT COUNT(*) FROM users
                         WHERE datetime(joined_at, ?1) >= datetime('now', ?1, '-7 days')",
                    )?,
                    month: count(
                        "SELECT COUNT(*) FROM users
                         WHERE datetime(joined_at, ?1) >= datetime('now', ?1, '-30 days')",
                    )?,
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("user stats degraded to zero: {e}");
                UserStats::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> (UserStore, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("reelgate-users-{name}.db"));
        std::fs::remove_file(&path).ok();
        let db = Database::open(&path).unwrap();
        (UserStore::new(db), path)
    }

    #[test]
    fn first_contact_inserts_later_contacts_update() {
        let (users, path) = store("contact");
        users.record_contact(100, Some("ann"));
        users.record_contact(100, Some("ann_renamed"));
        users.record_contact(200, None);

        let ids = users.all_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&100) && ids.contains(&200));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn stats_count_fresh_joins_everywhere() {
        let (users, path) = store("stats");
        users.record_contact(1, Some("a"));
        users.record_contact(2, Some("b"));

        let stats = users.stats(3);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.week, 2);
        assert_eq!(stats.month, 2);
        std::fs::remove_file(&path).ok();
    }
}
