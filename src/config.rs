//! Configuration file parser for ~/.config/datahtml/config.toml.
//!
//! The file is optional; a missing or empty file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are most likely typos.
//! `CHROME_SERVICE`, `CHROME_TOKEN` and `YOUTUBE_KEY` override the file.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::defaults::{AGENT, MAX_BODY_SIZE};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings shared by the crawlers and API clients.
///
/// Every key is optional. `chrome_token` and `youtube_key` are masked in the
/// `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User agent sent by the local crawler
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries on 429/5xx and truncated bodies. 0 disables retrying.
    pub max_retries: u32,

    /// Largest response body accepted, in bytes
    pub max_body_bytes: usize,

    /// Sitemap entries older than this many days are dropped
    pub sitemap_filter_days: i64,

    /// SQLite file for the URL index
    pub index_path: Option<PathBuf>,

    /// Base URL of the chrome rendering service
    pub chrome_service: Option<String>,

    pub chrome_token: Option<String>,

    /// YouTube Data API v3 key
    pub youtube_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: AGENT.to_string(),
            timeout_secs: 60,
            max_retries: 0,
            max_body_bytes: MAX_BODY_SIZE,
            sitemap_filter_days: 1,
            index_path: None,
            chrome_service: None,
            chrome_token: None,
            youtube_key: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("sitemap_filter_days", &self.sitemap_filter_days)
            .field("index_path", &self.index_path)
            .field("chrome_service", &self.chrome_service)
            .field(
                "chrome_token",
                &self.chrome_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "youtube_key",
                &self.youtube_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

const KNOWN_KEYS: &[&str] = &[
    "user_agent",
    "timeout_secs",
    "max_retries",
    "max_body_bytes",
    "sitemap_filter_days",
    "index_path",
    "chrome_service",
    "chrome_token",
    "youtube_key",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// `~/.config/datahtml/config.toml`, or `None` without `HOME`.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("datahtml")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "{} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Let `CHROME_SERVICE`, `CHROME_TOKEN` and `YOUTUBE_KEY` take
    /// precedence over the file.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        if let Some(service) = var("CHROME_SERVICE") {
            self.chrome_service = Some(service);
        }
        if let Some(token) = var("CHROME_TOKEN") {
            self.chrome_token = Some(token);
        }
        if let Some(key) = var("YOUTUBE_KEY") {
            self.youtube_key = Some(key);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("datahtml_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.user_agent, AGENT);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.sitemap_filter_days, 1);
        assert!(config.index_path.is_none());
        assert!(config.youtube_key.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/datahtml_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("blank", "  \n\t\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.user_agent, AGENT);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "timeout_secs = 15\nmax_retries = 3\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.sitemap_filter_days, 1);
        assert_eq!(config.user_agent, AGENT);
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
user_agent = "datahtml-test/1.0"
timeout_secs = 5
max_retries = 2
max_body_bytes = 1024
sitemap_filter_days = 7
index_path = "/var/lib/datahtml/index.db"
chrome_service = "http://chrome.local:8000"
chrome_token = "secret-token"
youtube_key = "yt-key"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.user_agent, "datahtml-test/1.0");
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.sitemap_filter_days, 7);
        assert_eq!(
            config.index_path.as_deref(),
            Some(Path::new("/var/lib/datahtml/index.db"))
        );
        assert_eq!(config.chrome_service.as_deref(), Some("http://chrome.local:8000"));
        assert_eq!(config.chrome_token.as_deref(), Some("secret-token"));
        assert_eq!(config.youtube_key.as_deref(), Some("yt-key"));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "timeout_secs = [unclosed");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrong_type", "timeout_secs = \"soon\"");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "timeout_sec = 5\nmax_retries = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let padding = "# padding\n".repeat(110_000);
        let path = write_config("too_large", &padding);
        assert!(matches!(Config::load(&path), Err(ConfigError::TooLarge(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let vars = HashMap::from([
            ("CHROME_TOKEN", "from-env"),
            ("YOUTUBE_KEY", ""),
        ]);
        let config = Config {
            chrome_token: Some("from-file".to_string()),
            youtube_key: Some("file-key".to_string()),
            ..Config::default()
        }
        .apply_vars(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.chrome_token.as_deref(), Some("from-env"));
        // Empty variables do not clear the file value
        assert_eq!(config.youtube_key.as_deref(), Some("file-key"));
        assert!(config.chrome_service.is_none());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = Config {
            chrome_token: Some("super-secret-token".to_string()),
            youtube_key: Some("AIzaSecretKey".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(!debug.contains("AIzaSecretKey"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_debug_shows_none_without_secrets() {
        let debug = format!("{:?}", Config::default());
        assert!(debug.contains("chrome_token: None"));
        assert!(!debug.contains("[REDACTED]"));
    }
}
