use crate::error::{Result, StrategyError};
use crate::persist::SyncOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = ".strategy-suite";
const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Per-machine client settings, `~/.strategy-suite/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Proxy server root. Without one, projects live in the local cache only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
    /// Directory holding the per-user project cache files. Defaults to the
    /// config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_load_timeout_secs() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            user: None,
            debounce_ms: default_debounce_ms(),
            load_timeout_secs: default_load_timeout_secs(),
            cache_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn config_dir() -> Result<PathBuf> {
        home::home_dir()
            .map(|h| h.join(CONFIG_DIR))
            .ok_or(StrategyError::HomeNotFound)
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Read the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            load_timeout: Duration::from_secs(self.load_timeout_secs),
        }
    }

    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = ClientConfig::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.sync_options().debounce, Duration::from_millis(1000));
        assert_eq!(cfg.sync_options().load_timeout, Duration::from_secs(10));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server_url: http://localhost:3001\nuser: alice\n").unwrap();
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.server_url.as_deref(), Some("http://localhost:3001"));
        assert_eq!(cfg.user.as_deref(), Some("alice"));
        assert_eq!(cfg.debounce_ms, 1000);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let cfg = ClientConfig {
            user: Some("bob".into()),
            debounce_ms: 250,
            cache_dir: Some(dir.path().to_path_buf()),
            ..ClientConfig::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap(), cfg);
        assert_eq!(cfg.resolved_cache_dir().unwrap(), dir.path());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "debounce_ms: [not, a, number]\n").unwrap();
        assert!(matches!(ClientConfig::load(&path), Err(StrategyError::Yaml(_))));
    }
}
