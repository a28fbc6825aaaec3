//! Closet API client error types.

/// Errors from Closet API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API returned a non-2xx status.
    #[error("Closet API {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// A request URL could not be built from the configured base.
    #[error("invalid request URL for {endpoint}: {source}")]
    Url {
        endpoint: String,
        source: url::ParseError,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl From<ApiError> for closet_core::ClosetError {
    fn from(err: ApiError) -> Self {
        closet_core::ClosetError::RemoteSync(err.to_string())
    }
}
