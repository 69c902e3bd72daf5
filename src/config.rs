use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabnotesError};

const CONFIG_FILE: &str = "config.json";

/// Prefix shared by every persisted note key.
pub const DEFAULT_KEY_PREFIX: &str = "note";
/// Quiet period after the last edit before dirty notes are flushed.
pub const DEFAULT_SAVE_INTERVAL_MS: u64 = 2000;
/// How often an interactive page checks its store for changes from other tabs.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Configuration for a note page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Key prefix; a note with id 5 is stored under "<prefix> 5"
    pub key_prefix: String,
    /// Debounce interval in milliseconds
    pub save_interval_ms: u64,
    /// Cross-tab poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            save_interval_ms: DEFAULT_SAVE_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WidgetConfig {
    /// Load `config.json` from the origin directory, falling back to defaults
    /// when the file does not exist.
    pub fn load(origin_dir: &Path) -> Result<Self> {
        let path = origin_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)?;
        let config: WidgetConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let prefix = self.key_prefix.as_str();
        if prefix.is_empty() || prefix.contains(char::is_whitespace) {
            return Err(TabnotesError::Config(format!(
                "key_prefix must be a non-empty word, got '{}'",
                prefix
            )));
        }
        if self.save_interval_ms == 0 {
            return Err(TabnotesError::Config(
                "save_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(TabnotesError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = WidgetConfig::default();
        assert_eq!(config.key_prefix, "note");
        assert_eq!(config.save_interval(), Duration::from_millis(2000));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = WidgetConfig::load(tmp.path()).unwrap();
        assert_eq!(config, WidgetConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), r#"{"save_interval_ms": 500}"#).unwrap();

        let config = WidgetConfig::load(tmp.path()).unwrap();
        assert_eq!(config.save_interval_ms, 500);
        assert_eq!(config.key_prefix, "note");
    }

    #[test]
    fn test_rejects_prefix_with_space() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), r#"{"key_prefix": "my note"}"#).unwrap();

        let err = WidgetConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, TabnotesError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = WidgetConfig {
            save_interval_ms: 0,
            ..WidgetConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
