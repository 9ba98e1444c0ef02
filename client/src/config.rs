//! Client configuration loading
//!
//! Loads configuration from `~/.config/tracker/client.toml` (or
//! `TRACKER_CLIENT_CONFIG` env). A missing file yields the defaults.
//! `TRACKER_API_KEY` overrides the configured API key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Connection settings for [`HttpAttributesClient`](crate::HttpAttributesClient).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server origin, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as `X-API-Key` when present
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tracker-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub const ENV_CONFIG_PATH: &'static str = "TRACKER_CLIENT_CONFIG";
    pub const ENV_API_KEY: &'static str = "TRACKER_API_KEY";
    const DEFAULT_CONFIG_FILENAME: &'static str = "client.toml";

    /// Load from the resolved path, falling back to defaults when absent.
    pub fn load() -> ApiResult<Self> {
        let path = Self::resolve_config_path();

        let mut cfg = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            tracing::info!(
                path = %path.display(),
                "client config not found, using defaults"
            );
            Self::default()
        };

        if let Ok(key) = std::env::var(Self::ENV_API_KEY)
            && !key.is_empty()
        {
            cfg.api_key = Some(key);
        }
        Ok(cfg)
    }

    pub fn load_from_path(path: &Path) -> ApiResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ApiError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(contents: &str) -> ApiResult<Self> {
        let cfg: ClientConfig = toml::from_str(contents)
            .map_err(|e| ApiError::InvalidConfig(format!("failed to parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash.
    pub fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("tracker")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    fn validate(&self) -> ApiResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = ClientConfig::parse("").unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn parses_all_fields() {
        let cfg = ClientConfig::parse(
            r#"
            base_url = "https://tracker.example.com/"
            api_key = "secret"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.origin(), "https://tracker.example.com");
        assert_eq!(cfg.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn rejects_zero_timeout_and_bad_scheme() {
        assert!(matches!(
            ClientConfig::parse("timeout_secs = 0"),
            Err(ApiError::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::parse("base_url = \"ftp://x\""),
            Err(ApiError::InvalidConfig(_))
        ));
    }

    #[test]
    #[serial]
    fn load_reads_env_path_and_key_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"http://127.0.0.1:9000\"\napi_key = \"from-file\"").unwrap();

        // SAFETY: serialized test; no other thread reads these variables.
        unsafe {
            std::env::set_var(ClientConfig::ENV_CONFIG_PATH, file.path());
            std::env::set_var(ClientConfig::ENV_API_KEY, "from-env");
        }
        let cfg = ClientConfig::load();
        unsafe {
            std::env::remove_var(ClientConfig::ENV_CONFIG_PATH);
            std::env::remove_var(ClientConfig::ENV_API_KEY);
        }

        let cfg = cfg.unwrap();
        assert_eq!(cfg.base_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        unsafe {
            std::env::set_var(ClientConfig::ENV_CONFIG_PATH, &missing);
        }
        let cfg = ClientConfig::load();
        unsafe {
            std::env::remove_var(ClientConfig::ENV_CONFIG_PATH);
        }
        assert_eq!(cfg.unwrap().base_url, default_base_url());
    }
}
