use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    Backoff, BackoffConfig, CallContext, ContextBackoff, ExponentialBackoff, HttpClient, Outcome,
    RequestDescriptor, Result, RetryPolicy,
};

/// Statuses above this are treated as transient server failures.
///
/// Only 502 and up qualify; 500 and 501 are final.
pub const RETRY_STATUS_FLOOR: u16 = 501;

impl HttpClient {
    /// Builds the default exponential backoff for one retry session.
    pub fn create_backoff(
        &self,
        ctx: &CallContext,
        max_elapsed_time: Duration,
    ) -> ContextBackoff<ExponentialBackoff> {
        BackoffConfig::default()
            .with_max_elapsed_time(max_elapsed_time)
            .build_with_context(ctx)
    }

    /// Sends `request` until it succeeds, fails terminally, runs out of
    /// retries or backoff, or `ctx` fires.
    ///
    /// The returned outcome is the last attempt's, except that a fired
    /// context replaces its error and an exhausted backoff drops its response.
    ///
    /// `backoff` is asked for a delay after every attempt that leaves retry
    /// budget and finds the context live, whether or not the attempt is then
    /// retried.
    pub async fn retry<B: Backoff>(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
        backoff: &mut B,
        policy: RetryPolicy,
    ) -> Outcome {
        self.run_retry(ctx, request, backoff, policy, false).await
    }

    /// Like [`HttpClient::retry`], decoding a successful body into `T`.
    ///
    /// Returns `Ok(None)` for 204 responses.
    pub async fn retry_json<T, B>(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
        backoff: &mut B,
        policy: RetryPolicy,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Backoff,
    {
        self.run_retry(ctx, request, backoff, policy, true)
            .await
            .into_result()
    }

    async fn run_retry<T, B>(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
        backoff: &mut B,
        policy: RetryPolicy,
        decode: bool,
    ) -> Outcome<T>
    where
        T: DeserializeOwned,
        B: Backoff,
    {
        let mut attempts = 0usize;
        loop {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                attempt = attempts + 1,
                "sending request"
            );

            let outcome = self.exchange::<T>(ctx, request, decode).await;
            attempts += 1;

            if attempts > policy.max_retries {
                return outcome;
            }
            // do not retry once the caller gave up
            if let Some(err) = ctx.err() {
                #[cfg(feature = "tracing")]
                tracing::error!(path = %request.path(), "http: {err}");
                return outcome.with_error(err);
            }

            let delay = backoff.next_backoff();
            if !is_retryable(&outcome, policy) {
                return outcome;
            }

            #[cfg(feature = "tracing")]
            {
                if let Some(err) = &outcome.error {
                    match outcome.status {
                        Some(status) => tracing::warn!(
                            path = %request.path(),
                            %status,
                            attempt = attempts,
                            "server error, retrying: {err}"
                        ),
                        None => tracing::warn!(
                            path = %request.path(),
                            attempt = attempts,
                            "request error, retrying: {err}"
                        ),
                    }
                }
            }

            let Some(delay) = delay else {
                #[cfg(feature = "tracing")]
                tracing::error!(path = %request.path(), attempts, "max retry limit reached");
                return outcome.without_response();
            };

            #[cfg(feature = "tracing")]
            tracing::debug!("retrying request after {} ms", delay.as_millis());

            tokio::select! {
                biased;
                err = ctx.done() => return outcome.with_error(err),
                () = sleep(delay) => {}
            }
        }
    }
}

/// Whether an attempt's failure is worth another attempt.
pub(crate) fn is_retryable<T>(outcome: &Outcome<T>, policy: RetryPolicy) -> bool {
    match outcome.status {
        Some(status) => {
            (policy.ignore_status_code && outcome.error.is_some())
                || status.as_u16() > RETRY_STATUS_FLOOR
        }
        None => outcome.error.is_some(),
    }
}
