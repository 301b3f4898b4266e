use reqwest::StatusCode;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Network or request execution error from `reqwest` before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,
    /// The caller's deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// Response with a status above 299.
    ///
    /// `message` is the response body when non-empty, otherwise the canonical
    /// reason phrase of the status.
    #[error("http error {status}: {message}")]
    Status { status: StatusCode, message: String },
    /// Successful response whose body did not match the requested shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Response body exceeded the configured in-memory limit.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    /// Invalid client or artifact configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Artifact type, operation or provider that has no handler.
    #[error("{0}")]
    Unsupported(String),
}

impl ProbeError {
    /// Returns `true` for explicit cancellation and elapsed deadlines.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// HTTP status carried by a [`ProbeError::Status`] error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or_default().to_owned()
        } else {
            String::from_utf8_lossy(body).into_owned()
        };
        Self::Status { status, message }
    }
}
