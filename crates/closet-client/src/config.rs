//! Closet client configuration.
//!
//! Configures the API base URL, the optional bearer token, and the tuning
//! knobs shared by the collection stores and the listing controller.
//! Defaults target a local development backend. Override via environment
//! variables or explicit construction for staging/testing.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Configuration for the Closet remote APIs and client-side tuning.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClosetConfig {
    /// Base URL of the API. Always ends with `/`.
    pub api_url: Url,
    /// Path of the paginated listing endpoint, relative to `api_url`.
    pub listing_path: String,
    /// Bearer token of the signed-in user, if any.
    pub api_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Items per listing page; also the initial skeleton count.
    pub batch_size: u32,
    /// Delay between items revealed by progressive fetch.
    pub reveal_delay: Duration,
    /// Delay after which the notification latch clears.
    pub toast_reset: Duration,
}

impl std::fmt::Debug for ClosetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosetConfig")
            .field("api_url", &self.api_url)
            .field("listing_path", &self.listing_path)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("reveal_delay", &self.reveal_delay)
            .field("toast_reset", &self.toast_reset)
            .finish()
    }
}

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api/";
const DEFAULT_LISTING_PATH: &str = "products";
const DEFAULT_BATCH_SIZE: u32 = 6;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REVEAL_DELAY_MS: u64 = 60;
const DEFAULT_TOAST_RESET_MS: u64 = 300;

impl ClosetConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CLOSET_API_URL` (default: `http://127.0.0.1:5000/api/`)
    /// - `CLOSET_LISTING_PATH` (default: `products`)
    /// - `CLOSET_API_TOKEN` (optional)
    /// - `CLOSET_TIMEOUT_SECS` (default: 30)
    /// - `CLOSET_BATCH_SIZE` (default: 6, must be positive)
    /// - `CLOSET_REVEAL_DELAY_MS` (default: 60)
    /// - `CLOSET_TOAST_RESET_MS` (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = std::env::var("CLOSET_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = parse_base_url("CLOSET_API_URL", &raw_url)?;
        let batch_size = env_number("CLOSET_BATCH_SIZE", u64::from(DEFAULT_BATCH_SIZE))?;
        let batch_size = u32::try_from(batch_size)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidNumber("CLOSET_BATCH_SIZE".into(), batch_size.to_string()))?;

        Ok(Self {
            api_url,
            listing_path: std::env::var("CLOSET_LISTING_PATH")
                .unwrap_or_else(|_| DEFAULT_LISTING_PATH.to_string()),
            api_token: std::env::var("CLOSET_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
            timeout_secs: env_number("CLOSET_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            batch_size,
            reveal_delay: Duration::from_millis(env_number(
                "CLOSET_REVEAL_DELAY_MS",
                DEFAULT_REVEAL_DELAY_MS,
            )?),
            toast_reset: Duration::from_millis(env_number(
                "CLOSET_TOAST_RESET_MS",
                DEFAULT_TOAST_RESET_MS,
            )?),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `uri` cannot be parsed.
    pub fn local_mock(uri: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_base_url("mock", uri)?,
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            api_token: None,
            timeout_secs: 5,
            batch_size: DEFAULT_BATCH_SIZE,
            reveal_delay: Duration::ZERO,
            toast_reset: Duration::from_millis(DEFAULT_TOAST_RESET_MS),
        })
    }

    /// Same configuration with a bearer token attached.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(Zeroizing::new(token.into()));
        self
    }
}

/// Parse a base URL, normalizing it to end with `/` so relative joins keep
/// the last path segment.
fn parse_base_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
    #[error("CLOSET_API_TOKEN is not a valid header value")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = ClosetConfig::local_mock("http://127.0.0.1:9000").unwrap();
        assert_eq!(cfg.api_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.batch_size, 6);
        assert!(cfg.api_token.is_none());
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let url = parse_base_url("X", "https://shop.example/api/v2").unwrap();
        assert_eq!(url.join("wishlist").unwrap().as_str(), "https://shop.example/api/v2/wishlist");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = ClosetConfig::local_mock("http://127.0.0.1:9000")
            .unwrap()
            .with_token("secret-token");
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn env_number_rejects_garbage() {
        std::env::set_var("TEST_CLOSET_BAD_NUMBER", "six");
        let result = env_number("TEST_CLOSET_BAD_NUMBER", 6);
        std::env::remove_var("TEST_CLOSET_BAD_NUMBER");
        assert!(result.is_err());
        assert_eq!(env_number("TEST_CLOSET_ABSENT_NUMBER", 6).unwrap(), 6);
    }
}
