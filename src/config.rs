use std::time::Duration;

use serde::Deserialize;

/// Prefix shared by every environment variable the client reads
const ENV_PREFIX: &str = "BOOKMARK_";

/// Client configuration loaded from `BOOKMARK_*` environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the bookmark API (`BOOKMARK_API_URL`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token of the signed-in user (`BOOKMARK_AUTH_TOKEN`)
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Upper bound for a single remote call in milliseconds (`BOOKMARK_TIMEOUT_MS`)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            auth_token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_unset() {
        let config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(Vec::<(String, String)>::new())
            .unwrap();
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert!(config.auth_token.is_none());
        assert_eq!(config.request_timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_prefixed_variables_are_read() {
        let vars = vec![
            ("BOOKMARK_API_URL".to_string(), "https://api.example.com".to_string()),
            ("BOOKMARK_AUTH_TOKEN".to_string(), "secret".to_string()),
            ("BOOKMARK_TIMEOUT_MS".to_string(), "250".to_string()),
        ];
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
    }
}
