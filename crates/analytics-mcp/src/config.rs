//! Server configuration.
//!
//! Configuration is read once from the process environment at startup. The
//! two required values (service account key path and GA4 property id) gate
//! client construction: if either is absent the process must fail before any
//! tool is registered.

use std::time::Duration;
use thiserror::Error;

/// Default base URL for the GA4 Data API.
pub const DEFAULT_API_URL: &str = "https://analyticsdata.googleapis.com";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("{0} environment variable is required")]
    MissingEnvVar(String),
}

/// Google Analytics server configuration.
#[derive(Debug, Clone)]
pub struct GaConfig {
    /// Path to the service account key file.
    pub credentials_path: String,

    /// GA4 property id to query (numeric identifier).
    pub property_id: String,

    /// Base URL of the GA4 Data API.
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl GaConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GOOGLE_APPLICATION_CREDENTIALS` (required): path to the service
    ///   account key JSON file
    /// - `GA4_PROPERTY_ID` (required): GA4 property id to query
    /// - `GA4_API_URL`: Data API base URL (default: the public endpoint)
    /// - `GA4_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials_path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
            .map_err(|_| ConfigError::MissingEnvVar("GOOGLE_APPLICATION_CREDENTIALS".to_string()))?;
        let property_id = std::env::var("GA4_PROPERTY_ID")
            .map_err(|_| ConfigError::MissingEnvVar("GA4_PROPERTY_ID".to_string()))?;

        Ok(Self {
            credentials_path,
            property_id,
            api_base_url: std::env::var("GA4_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout_secs: std::env::var("GA4_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        let config = GaConfig {
            credentials_path: "/tmp/key.json".to_string(),
            property_id: "123456".to_string(),
            api_base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
        };
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar("GA4_PROPERTY_ID".to_string());
        assert_eq!(
            err.to_string(),
            "GA4_PROPERTY_ID environment variable is required"
        );
    }

    // Serialized env-var test: both required variables are manipulated in one
    // test function so parallel test threads cannot observe partial state.
    #[test]
    fn test_from_env() {
        std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
        std::env::remove_var("GA4_PROPERTY_ID");
        let err = GaConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_APPLICATION_CREDENTIALS"));

        std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json");
        let err = GaConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("GA4_PROPERTY_ID"));

        std::env::set_var("GA4_PROPERTY_ID", "123456");
        let config = GaConfig::from_env().unwrap();
        assert_eq!(config.property_id, "123456");
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
        std::env::remove_var("GA4_PROPERTY_ID");
    }
}
