//! Cancellation signal shared by the transport call and the backoff sleep.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::ProbeError;

/// Caller-supplied cancellation token plus an optional deadline.
///
/// Cloning is cheap; clones observe the same token and deadline.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never fires unless [`CallContext::cancel`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets a deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The error describing why this context fired, if it has.
    pub fn err(&self) -> Option<ProbeError> {
        if self.token.is_cancelled() {
            return Some(ProbeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ProbeError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn done(&self) -> ProbeError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => ProbeError::Cancelled,
                () = sleep_until(deadline) => ProbeError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ProbeError::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_after_timeout() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(2));
        assert!(ctx.err().is_none());

        let err = ctx.done().await;
        assert!(matches!(err, ProbeError::DeadlineExceeded));
        assert!(matches!(ctx.err(), Some(ProbeError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn cancel_is_seen_by_clones() {
        let ctx = CallContext::new();
        let clone = ctx.clone();
        ctx.cancel();

        assert!(clone.is_done());
        assert!(matches!(clone.done().await, ProbeError::Cancelled));
    }

    #[tokio::test]
    async fn earlier_deadline_wins() {
        let near = Instant::now() + Duration::from_secs(1);
        let ctx = CallContext::new()
            .with_deadline(near)
            .with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(near));
    }
}
