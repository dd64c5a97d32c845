//! Configuration for the dbt proxy.

use std::fmt;

use config::{Config as ConfigLoader, Environment};
use serde::Deserialize;

/// Upstream dbt Cloud settings.
#[derive(Clone)]
pub struct DbtConfig {
    /// API base, e.g. `https://cloud.getdbt.com/api/v2`
    pub base_url: String,
    pub account_id: String,
    /// Service token sent as `Authorization: Token <api_key>`.
    pub api_key: String,
    pub latest_run_timeout_secs: u64,
    pub artifact_timeout_secs: u64,
}

impl fmt::Debug for DbtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbtConfig")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("api_key", &"<redacted>")
            .field("latest_run_timeout_secs", &self.latest_run_timeout_secs)
            .field("artifact_timeout_secs", &self.artifact_timeout_secs)
            .finish()
    }
}

/// Application configuration, loaded once at startup and never mutated.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dbt: DbtConfig,
    /// Shared secret callers must present. `None` rejects every protected call.
    pub proxy_secret: Option<String>,
    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbt", &self.dbt)
            .field(
                "proxy_secret",
                &self.proxy_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid port number: {0}")]
    InvalidPort(String),
    #[error("Invalid timeout for {0}: must be greater than zero")]
    InvalidTimeout(&'static str),
    #[error(transparent)]
    Loader(#[from] config::ConfigError),
}

/// Environment variables as read by the `config` crate (keys lowercased).
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default)]
    port: Option<String>,
    #[serde(default)]
    dbt_account_id: Option<String>,
    #[serde(default)]
    dbt_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    dbt_base_url: String,
    #[serde(default)]
    dbt_latest_run_timeout_secs: Option<u64>,
    #[serde(default)]
    dbt_artifact_timeout_secs: Option<u64>,
    #[serde(default)]
    proxy_secret: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_base_url() -> String {
    "https://mn615.us1.dbt.com/api/v2".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
const DEFAULT_LATEST_RUN_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ARTIFACT_TIMEOUT_SECS: u64 = 30;

/// Treat empty values the same as unset ones.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn timeout_or_default(
    value: Option<u64>,
    default: u64,
    name: &'static str,
) -> Result<u64, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::InvalidTimeout(name)),
        Some(secs) => Ok(secs),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Recognized variables: `DBT_ACCOUNT_ID`, `DBT_API_KEY` (required),
    /// `PROXY_SECRET`, `PORT`, `HOST`, `DBT_BASE_URL`,
    /// `DBT_LATEST_RUN_TIMEOUT_SECS`, `DBT_ARTIFACT_TIMEOUT_SECS`, `LOG_LEVEL`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    /// Load configuration from an explicit environment source.
    ///
    /// Values are kept as strings; a secret like `0123` must not be coerced
    /// into a number.
    pub fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = ConfigLoader::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let port = match non_empty(raw.port) {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port))?,
            None => default_port(),
        };

        let account_id = non_empty(raw.dbt_account_id)
            .ok_or(ConfigError::MissingEnvVar("DBT_ACCOUNT_ID"))?;
        let api_key =
            non_empty(raw.dbt_api_key).ok_or(ConfigError::MissingEnvVar("DBT_API_KEY"))?;

        Ok(Config {
            host: raw.host,
            port,
            dbt: DbtConfig {
                base_url: raw.dbt_base_url,
                account_id,
                api_key,
                latest_run_timeout_secs: timeout_or_default(
                    raw.dbt_latest_run_timeout_secs,
                    DEFAULT_LATEST_RUN_TIMEOUT_SECS,
                    "DBT_LATEST_RUN_TIMEOUT_SECS",
                )?,
                artifact_timeout_secs: timeout_or_default(
                    raw.dbt_artifact_timeout_secs,
                    DEFAULT_ARTIFACT_TIMEOUT_SECS,
                    "DBT_ARTIFACT_TIMEOUT_SECS",
                )?,
            },
            proxy_secret: non_empty(raw.proxy_secret),
            log_level: raw.log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_environment(Environment::default().source(Some(map)))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load_from(&[("DBT_ACCOUNT_ID", "42"), ("DBT_API_KEY", "dbtc_abc")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.dbt.base_url, "https://mn615.us1.dbt.com/api/v2");
        assert_eq!(config.dbt.account_id, "42");
        assert_eq!(config.dbt.latest_run_timeout_secs, 15);
        assert_eq!(config.dbt.artifact_timeout_secs, 30);
        assert_eq!(config.proxy_secret, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let config = load_from(&[
            ("DBT_ACCOUNT_ID", "42"),
            ("DBT_API_KEY", "dbtc_abc"),
            ("PROXY_SECRET", "0123"),
            ("PORT", "9090"),
            ("DBT_BASE_URL", "http://localhost:1234/api/v2"),
            ("DBT_ARTIFACT_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.proxy_secret.as_deref(), Some("0123"));
        assert_eq!(config.dbt.base_url, "http://localhost:1234/api/v2");
        assert_eq!(config.dbt.artifact_timeout_secs, 5);
    }

    #[test]
    fn test_missing_account_id() {
        let err = load_from(&[("DBT_API_KEY", "dbtc_abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("DBT_ACCOUNT_ID")));
    }

    #[test]
    fn test_empty_api_key_is_missing() {
        let err = load_from(&[("DBT_ACCOUNT_ID", "42"), ("DBT_API_KEY", "")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("DBT_API_KEY")));
    }

    #[test]
    fn test_empty_secret_is_unset() {
        let config = load_from(&[
            ("DBT_ACCOUNT_ID", "42"),
            ("DBT_API_KEY", "dbtc_abc"),
            ("PROXY_SECRET", ""),
        ])
        .unwrap();
        assert_eq!(config.proxy_secret, None);
    }

    #[test]
    fn test_invalid_port() {
        let err = load_from(&[
            ("DBT_ACCOUNT_ID", "42"),
            ("DBT_API_KEY", "dbtc_abc"),
            ("PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load_from(&[
            ("DBT_ACCOUNT_ID", "42"),
            ("DBT_API_KEY", "dbtc_abc"),
            ("DBT_LATEST_RUN_TIMEOUT_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTimeout("DBT_LATEST_RUN_TIMEOUT_SECS")
        ));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = load_from(&[
            ("DBT_ACCOUNT_ID", "42"),
            ("DBT_API_KEY", "dbtc_topsecret"),
            ("PROXY_SECRET", "hunter2"),
        ])
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("dbtc_topsecret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
