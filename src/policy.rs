//! Exponential backoff bounded by a maximum elapsed time.

use std::time::{Duration, Instant};

use ::backoff::{backoff::Backoff, default, exponential, Clock, ExponentialBackoffBuilder};

use crate::CallContext;

/// Clock driven by tokio's timer, so a paused runtime controls elapsed time.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Exponential policy measured on [`TokioClock`].
pub type ExponentialBackoff = exponential::ExponentialBackoff<TokioClock>;

/// Tunables for [`ExponentialBackoff`].
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    pub initial_interval: Duration,
    pub multiplier: f64,
    /// Each delay is drawn from `interval * [1 - factor, 1 + factor]`.
    pub randomization_factor: f64,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(default::INITIAL_INTERVAL_MILLIS),
            multiplier: default::MULTIPLIER,
            randomization_factor: default::RANDOMIZATION_FACTOR,
            max_interval: Duration::from_millis(default::MAX_INTERVAL_MILLIS),
            max_elapsed_time: Duration::from_millis(default::MAX_ELAPSED_TIME_MILLIS),
        }
    }
}

impl BackoffConfig {
    pub fn with_max_elapsed_time(mut self, max_elapsed_time: Duration) -> Self {
        self.max_elapsed_time = max_elapsed_time;
        self
    }

    /// Builds a policy whose elapsed clock starts now.
    pub fn build(&self) -> ExponentialBackoff {
        let base = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.randomization_factor)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_elapsed_time))
            .build();

        let mut backoff = ExponentialBackoff {
            current_interval: base.current_interval,
            initial_interval: base.initial_interval,
            randomization_factor: base.randomization_factor,
            multiplier: base.multiplier,
            max_interval: base.max_interval,
            start_time: TokioClock.now(),
            max_elapsed_time: base.max_elapsed_time,
            clock: TokioClock,
        };
        backoff.reset();
        backoff
    }

    /// Builds a policy that stops as soon as `ctx` fires.
    pub fn build_with_context(&self, ctx: &CallContext) -> ContextBackoff<ExponentialBackoff> {
        ContextBackoff::new(self.build(), ctx)
    }
}

/// Wraps a policy so it reports stop once the call context has fired.
///
/// Owned by a single retry session; never share one across calls.
#[derive(Debug)]
pub struct ContextBackoff<B> {
    inner: B,
    ctx: CallContext,
}

impl<B> ContextBackoff<B> {
    pub fn new(inner: B, ctx: &CallContext) -> Self {
        Self {
            inner,
            ctx: ctx.clone(),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: Backoff> Backoff for ContextBackoff<B> {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.ctx.is_done() {
            return None;
        }
        self.inner.next_backoff()
    }
}
