use std::time::Duration;
use thiserror::Error;

// * Unified Error type for the Network Layer.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Blocked by interstitial: {0}")]
    Blocked(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Rendering is not supported by this fetcher")]
    RenderUnsupported,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl NetworkError {
    /// Worth retrying: timeouts, connection failures, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Request(e) => e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.as_u16() == 429 || s.is_server_error()),
            NetworkError::Status(code) => *code == 429 || (500..600).contains(code),
            NetworkError::Timeout(_) | NetworkError::Unavailable(_) => true,
            NetworkError::Blocked(_)
            | NetworkError::Parse(_)
            | NetworkError::RenderUnsupported
            | NetworkError::InvalidUrl(_) => false,
        }
    }

    /// The resource does not exist, as opposed to the service failing
    pub fn is_not_found(&self) -> bool {
        matches!(self, NetworkError::Status(404) | NetworkError::Status(410))
    }
}
