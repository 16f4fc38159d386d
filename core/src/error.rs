use thiserror::Error;

/// Failure modes of the remote praise API, mapped from HTTP status codes and
/// transport errors at the client edge.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Not authorized. Check the app token and try again")]
    Unauthorized,
    #[error("Daily moment limit reached")]
    LimitReached,
    #[error("Not found on the server")]
    NotFound,
    #[error("Server error (HTTP {0})")]
    Server(u16),
    #[error("Could not decode server response: {0}")]
    Decode(String),
    #[error("Request timed out")]
    Timeout,
    #[error("You appear to be offline")]
    Offline,
    #[error("Network error: {0}")]
    Network(String),
}

impl ApiError {
    /// Transient failures worth retrying with backoff. Auth, validation,
    /// not-found, and limit errors surface to the user instead.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Server(_) | Self::Timeout | Self::Offline | Self::Network(_)
        )
    }
}
