use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::paginate::DEFAULT_PAGE_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_secs: u64,
    pub cache_ttl_minutes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            cache_ttl_minutes: 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub records_per_page: usize,
    pub default_timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            records_per_page: DEFAULT_PAGE_SIZE,
            default_timezone: "UTC".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Missing file means defaults; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.sync.cache_ttl_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults_match_feed_cadence() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.cache_ttl(), Duration::from_secs(50 * 60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.display.records_per_page, 20);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            endpoint = "http://edge.local:5000"

            [sync]
            poll_interval_secs = 15
            "#,
        )
        .expect("parse");
        assert_eq!(config.server.endpoint.as_deref(), Some("http://edge.local:5000"));
        assert_eq!(config.server.request_timeout_secs, 10);
        assert_eq!(config.sync.poll_interval_secs, 15);
        assert_eq!(config.sync.cache_ttl_minutes, 50);
        assert_eq!(config.display, DisplayConfig::default());
    }

    #[test]
    fn missing_file_is_default_and_bad_file_is_error() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("config.toml");
        assert_eq!(Config::load(&missing).expect("load"), Config::default());

        std::fs::write(&missing, "[sync]\npoll_interval_secs = \"soon\"\n").expect("write");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Parse(_))));
    }
}
