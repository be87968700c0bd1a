use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// redb file for project documents. `None` disables storage.
    pub data_path: Option<PathBuf>,
    /// `None` disables suggestions.
    pub gemini: Option<GeminiConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: None,
            gemini: None,
        }
    }
}

impl ServerConfig {
    /// `PORT`, `STRATEGY_DATA`, `GEMINI_API_KEY`, `GEMINI_MODEL`,
    /// `GEMINI_ENDPOINT`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT '{p}': {e}"))?,
            None => DEFAULT_PORT,
        };

        let data_path = var("STRATEGY_DATA").map(PathBuf::from);
        if data_path.is_none() {
            tracing::warn!("STRATEGY_DATA not set, project storage is disabled");
        }

        let gemini = var("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            endpoint: var("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
        });
        if gemini.is_none() {
            tracing::warn!("GEMINI_API_KEY not set, AI suggestions are disabled");
        }

        Ok(Self {
            port,
            data_path,
            gemini,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_disables_everything() {
        assert_eq!(from(&[]).unwrap(), ServerConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = from(&[
            ("PORT", "8080"),
            ("STRATEGY_DATA", "/var/lib/strategy.redb"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-pro"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_path, Some(PathBuf::from("/var/lib/strategy.redb")));
        let gemini = cfg.gemini.unwrap();
        assert_eq!(gemini.api_key, "secret");
        assert_eq!(gemini.model, "gemini-pro");
        assert_eq!(gemini.endpoint, DEFAULT_GEMINI_ENDPOINT);
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        assert_eq!(from(&[("GEMINI_API_KEY", "  ")]).unwrap().gemini, None);
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(from(&[("PORT", "http")]).is_err());
    }
}
