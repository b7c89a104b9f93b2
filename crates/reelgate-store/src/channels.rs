//! Required channels for the subscription gate.

use crate::db::Database;
use reelgate_core::civil::ChannelSpec;
use reelgate_core::error::Result;

/// A channel the user must be subscribed to before the catalog opens.
/// `channel_id` is the platform chat id used by the membership probe; rows
/// without one are shown on the keyboard but never probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredChannel {
    pub id: i64,
    pub label: String,
    pub link: String,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChannelStore {
    db: Database,
}

impl ChannelStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn add(&self, spec: &ChannelSpec) -> Result<()> {
        self.db.with_conn("add required channel", |conn| {
            conn.execute(
                "INSERT INTO required_channels (label, link, channel_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![spec.label, spec.link, spec.channel_id],
            )
        })?;
        Ok(())
    }

    pub fn clear(&self) {
        if let Err(e) = self
            .db
            .with_conn("clear required channels", |conn| {
                conn.execute("DELETE FROM required_channels", [])
            })
        {
            tracing::warn!("clearing required channels degraded to no-op: {e}");
        }
    }

    pub fn remove(&self, id: i64) -> bool {
        self.db
            .with_conn("remove required channel", |conn| {
                conn.execute(
                    "DELETE FROM required_channels WHERE id = ?1",
                    rusqlite::params![id],
                )
            })
            .map(|n| n > 0)
            .unwrap_or_else(|e| {
                tracing::warn!("removing required channel {id} degraded to no-op: {e}");
                false
            })
    }

    pub fn all(&self) -> Vec<RequiredChannel> {
        self.db
            .with_conn("list required channels", |conn| {
                let mut stmt = conn
                    .prepare("SELECT id, label, link, channel_id FROM required_channels ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(RequiredChannel {
                        id: row.get(0)?,
                        label: row.get(1)?,
                        link: row.get(2)?,
                        channel_id: row.get(3)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap_or_else(|e| {
                tracing::warn!("required channel listing degraded to empty: {e}");
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_list_clear() {
        let path = std::env::temp_dir().join("reelgate-channels-test.db");
        std::fs::remove_file(&path).ok();
        let channels = ChannelStore::new(Database::open(&path).unwrap());

        channels
            .add(&ChannelSpec {
                label: "News".into(),
                link: "https://t.me/news".into(),
                channel_id: Some("-100123".into()),
            })
            .unwrap();
        channels
            .add(&ChannelSpec {
                label: "Partner".into(),
                link: "https://t.me/partner".into(),
                channel_id: None,
            })
            .unwrap();

        let all = channels.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].label, "News");

        assert!(channels.remove(all[0].id));
        assert!(!channels.remove(all[0].id));

        channels.clear();
        assert!(channels.all().is_empty());
        std::fs::remove_file(&path).ok();
    }
}
