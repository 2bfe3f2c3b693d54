//! Connection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default transfer timeout for API requests.
const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 30_000;

/// Default base URL of a local hydownloader daemon.
pub const DEFAULT_API_URL: &str = "https://127.0.0.1:53211";

/// Everything the dispatcher needs to reach the hydownloader API.
///
/// Every field can be changed at any time through the setters on
/// [`Connection`](crate::Connection); changes apply to calls issued afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Base URL every endpoint path is appended to
    pub api_url: String,
    /// Value of the `HyDownloader-Access-Key` header
    pub access_key: String,
    /// Whether TLS peer certificates are verified
    pub verify_certificates: bool,
    /// HSTS equivalent: refuse plain HTTP URLs
    pub strict_transport_security: bool,
    /// Per-request transfer timeout
    #[serde(with = "duration_ms")]
    pub transfer_timeout: Duration,
    /// Master switch; a disabled connection issues nothing
    pub enabled: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_key: String::new(),
            verify_certificates: true,
            strict_transport_security: false,
            transfer_timeout: Duration::from_millis(DEFAULT_TRANSFER_TIMEOUT_MS),
            enabled: true,
        }
    }
}

impl ConnectionConfig {
    pub fn new(api_url: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            access_key: access_key.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `HYDL_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_url = std::env::var("HYDL_API_URL").unwrap_or(defaults.api_url);
        let access_key = std::env::var("HYDL_ACCESS_KEY").unwrap_or_default();
        let verify_certificates =
            env_flag("HYDL_VERIFY_CERTIFICATES").unwrap_or(defaults.verify_certificates);
        let strict_transport_security = env_flag("HYDL_STRICT_TRANSPORT_SECURITY")
            .unwrap_or(defaults.strict_transport_security);
        let timeout_ms: u64 = std::env::var("HYDL_TRANSFER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_MS);
        let enabled = env_flag("HYDL_ENABLED").unwrap_or(defaults.enabled);

        Self {
            api_url,
            access_key,
            verify_certificates,
            strict_transport_security,
            transfer_timeout: Duration::from_millis(timeout_ms),
            enabled,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert!(config.enabled);
        assert!(config.verify_certificates);
        assert!(!config.strict_transport_security);
        assert_eq!(config.transfer_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = ConnectionConfig::new("http://localhost:53211//", "key");
        assert_eq!(config.base_url(), "http://localhost:53211");
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"apiUrl":"http://h:1","transferTimeout":500}"#).unwrap();
        assert_eq!(config.api_url, "http://h:1");
        assert_eq!(config.transfer_timeout, Duration::from_millis(500));
        assert!(config.enabled);
        assert!(config.access_key.is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
