//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `SHOPFRONT_API_URL` - Storefront API base URL (default: `http://localhost:8000`)
//! - `SHOPFRONT_DATA_DIR` - Directory for the persisted token and cart (default: `.shopfront`)
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `SHOPFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache time-to-live in seconds (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_DATA_DIR: &str = ".shopfront";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the storefront API. Always ends with a `/`.
    pub api_url: Url,
    /// Directory holding persisted client state
    pub data_dir: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(
            "SHOPFRONT_API_URL",
            &get_env_or_default("SHOPFRONT_API_URL", DEFAULT_API_URL),
        )?;
        let data_dir = PathBuf::from(get_env_or_default("SHOPFRONT_DATA_DIR", DEFAULT_DATA_DIR));
        let request_timeout = parse_seconds(
            "SHOPFRONT_REQUEST_TIMEOUT_SECS",
            &get_env_or_default("SHOPFRONT_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        )?;
        let catalog_cache_ttl = parse_seconds(
            "SHOPFRONT_CATALOG_CACHE_TTL_SECS",
            &get_env_or_default("SHOPFRONT_CATALOG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        )?;

        Ok(Self {
            api_url,
            data_dir,
            request_timeout,
            catalog_cache_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_url` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not an http(s) URL.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url("SHOPFRONT_API_URL", api_url)?,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_secs(30),
            catalog_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Replace the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse the API base URL, normalizing it to end with `/` so relative
/// endpoint paths join under it instead of replacing its last segment.
fn parse_api_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse a positive number of seconds.
fn parse_seconds(var_name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let url = parse_api_url("X", "https://shop.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/api/");
        assert_eq!(
            url.join("auth/login").unwrap().as_str(),
            "https://shop.example.com/api/auth/login"
        );
    }

    #[test]
    fn test_api_url_root_is_unchanged() {
        let url = parse_api_url("X", "http://localhost:8000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_api_url_rejects_other_schemes() {
        let err = parse_api_url("SHOPFRONT_API_URL", "ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(name, _) if name == "SHOPFRONT_API_URL"));
        assert!(parse_api_url("X", "not a url").is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("X", " 15 ").unwrap(), Duration::from_secs(15));
        assert!(parse_seconds("X", "0").is_err());
        assert!(parse_seconds("X", "-3").is_err());
        assert!(parse_seconds("X", "soon").is_err());
    }

    #[test]
    fn test_for_api_url_defaults() {
        let config = ClientConfig::for_api_url("http://127.0.0.1:9000")
            .unwrap()
            .with_data_dir("/tmp/shopfront-test");
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/shopfront-test"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.sentry_dsn.is_none());
    }
}
