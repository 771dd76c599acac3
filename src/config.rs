//! Runtime configuration
//!
//! The backend host is selected by environment variable, mirroring the
//! deployment setup of the web console this app replaces.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the backend base URL
pub const ENV_API_BASE_URL: &str = "CALLBOT_API_BASE_URL";
/// Environment variable overriding the request timeout (seconds)
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CALLBOT_REQUEST_TIMEOUT_SECS";
/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "CALLBOT_DATA_DIR";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend base URL, no trailing slash
    pub api_base_url: String,
    /// Per-request timeout (default: 15s)
    pub request_timeout_secs: u64,
    /// Directory holding the session file
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            data_dir: default_data_dir(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let api_base_url = std::env::var(ENV_API_BASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| normalize_base_url(&v))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout_secs = std::env::var(ENV_REQUEST_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let data_dir = std::env::var(ENV_DATA_DIR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Self {
            api_base_url,
            request_timeout_secs,
            data_dir,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configured base URL
    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.api_base_url)
            .map_err(|e| format!("Invalid API base URL: {}", e))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(format!("Unsupported URL scheme: {}", other)),
        }
    }
}

/// Strip trailing slashes so endpoint joining stays predictable
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("CallbotAdmin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_base_url("http://api.example.com///"), "http://api.example.com");
        assert_eq!(normalize_base_url("  http://x "), "http://x");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = AppConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
