//! Layered CLI configuration.
//!
//! Priority, lowest first: built-in defaults, the TOML file, then
//! `KITSU_PAIRING_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pairing_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// File read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "kitsu-pairing.toml";

/// Prefix of the environment variables that override file values.
pub const ENV_PREFIX: &str = "KITSU_PAIRING_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Root of the Kitsu addon endpoints on the Ayon server.
    pub server_url: Option<String>,
    /// Bearer token of the Ayon session.
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub log_format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
    /// OTLP/gRPC collector endpoint; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            token: None,
            timeout_seconds: 30,
            log_format: LogFormat::Pretty,
            log_filter: "info".to_string(),
            otlp_endpoint: None,
        }
    }
}

impl CliConfig {
    /// Loads the configuration from `path` (or [`DEFAULT_CONFIG_FILE`]) and
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, ENV_PREFIX)
    }

    /// Like [`load`](Self::load) with a custom environment prefix.
    pub fn load_with(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let file = match path {
            Some(path) if !path.exists() => {
                bail!("configuration file '{}' does not exist", path.display())
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(env_prefix))
            .extract()
            .with_context(|| format!("failed to load configuration from '{}'", file.display()))?;

        if config.timeout_seconds == 0 {
            bail!("timeout_seconds must be greater than zero");
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Connection settings for the pairing store.
    ///
    /// Fails when the server URL or token is missing.
    pub fn store_config(&self) -> Result<StoreConfig> {
        let base_url = self
            .server_url
            .clone()
            .filter(|url| !url.is_empty())
            .with_context(|| format!("server_url is not set (config file or {ENV_PREFIX}SERVER_URL)"))?;
        let token = self
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .with_context(|| format!("token is not set (config file or {ENV_PREFIX}TOKEN)"))?;

        Ok(StoreConfig {
            base_url,
            token,
            timeout: self.timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // Prefix no real environment sets, so tests see file values only.
    const TEST_PREFIX: &str = "KITSU_PAIRING_TEST_UNSET_";

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("kitsu-pairing.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_when_the_file_is_absent() {
        let config = CliConfig::load_with(None, TEST_PREFIX).unwrap();

        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_filter, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
server_url = "http://ayon.local/api/addons/kitsu/1.0.0"
token = "abc"
timeout_seconds = 5
log_format = "json"
"#,
        );

        let config = CliConfig::load_with(Some(&path), TEST_PREFIX).unwrap();
        let store = config.store_config().unwrap();

        assert_eq!(store.base_url, "http://ayon.local/api/addons/kitsu/1.0.0");
        assert_eq!(store.token, "abc");
        assert_eq!(store.timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = CliConfig::load_with(Some(&missing), TEST_PREFIX).unwrap_err();

        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "timeout_seconds = 0\n");

        assert!(CliConfig::load_with(Some(&path), TEST_PREFIX).is_err());
    }

    #[test]
    fn store_config_requires_url_and_token() {
        let config = CliConfig {
            server_url: Some("http://ayon.local".to_string()),
            token: Some(String::new()),
            ..CliConfig::default()
        };

        let err = config.store_config().unwrap_err();

        assert!(err.to_string().contains("token is not set"));
    }
}
