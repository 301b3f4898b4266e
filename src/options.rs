/// Configures transport behavior of an [`HttpClient`](crate::HttpClient).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Largest response body kept in memory.
    pub max_body_bytes: usize,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_body_bytes: 10 * 1024 * 1024,
            accept_invalid_certs: false,
        }
    }
}

/// Per-call retry settings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Retry any attempt that produced an error, whatever its status.
    pub ignore_status_code: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ignore_status_code: false,
        }
    }

    pub fn ignore_status_code(mut self, ignore: bool) -> Self {
        self.ignore_status_code = ignore;
        self
    }
}
