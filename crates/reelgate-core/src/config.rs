//! Reelgate configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReelgateError, Result};

/// Root configuration, loaded from `~/.reelgate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelgateConfig {
    /// Bot API token. Required at runtime; empty default so a fresh config
    /// file can be written and filled in.
    #[serde(default)]
    pub bot_token: String,
    /// Chat id of the operator. Completion notices and admin commands are
    /// bound to this identity.
    #[serde(default)]
    pub operator_chat_id: i64,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Reference timezone as whole hours east of UTC. Every schedule is
    /// interpreted in this single zone, never the host's local zone.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Pause between consecutive fan-out sends, for platform rate limits.
    #[serde(default = "default_fanout_pace_ms")]
    pub fanout_pace_ms: u64,
    /// Long-poll timeout for update fetching.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_db_path() -> String {
    "~/.reelgate/reelgate.db".into()
}
fn default_utc_offset_hours() -> i32 {
    3
}
fn default_fanout_pace_ms() -> u64 {
    50
}
fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for ReelgateConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            operator_chat_id: 0,
            db_path: default_db_path(),
            utc_offset_hours: default_utc_offset_hours(),
            fanout_pace_ms: default_fanout_pace_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl ReelgateConfig {
    /// Load config from the default path, falling back to defaults when the
    /// file does not exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelgateError::Config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ReelgateError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelgateError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the reelgate home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reelgate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReelgateConfig::default();
        assert_eq!(config.utc_offset_hours, 3);
        assert_eq!(config.fanout_pace_ms, 50);
        assert!(config.bot_token.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            bot_token = "123:abc"
            operator_chat_id = 42
            utc_offset_hours = 0
        "#;

        let config: ReelgateConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.operator_chat_id, 42);
        assert_eq!(config.utc_offset_hours, 0);
        // Untouched fields keep their defaults.
        assert_eq!(config.poll_timeout_secs, 30);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: ReelgateConfig = toml::from_str("").unwrap();
        assert_eq!(config.db_path, "~/.reelgate/reelgate.db");
    }
}
