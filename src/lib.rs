//! `artifact-probe` is a resilient async HTTP request executor.
//!
//! One logical request is sent with [`HttpClient::retry`] or
//! [`HttpClient::retry_json`]; transport failures and overloaded-server
//! responses are retried with exponential backoff until the request
//! succeeds, fails terminally, exhausts its retry budget or backoff, or the
//! caller's [`CallContext`] fires.
//!
//! The [`artifact`] module builds artifact server validation on top of it.

pub mod artifact;
mod body;
mod client;
mod context;
mod error;
mod options;
mod policy;
mod request;
mod retry;

pub use backoff::backoff::Backoff;
pub use client::{HttpClient, Outcome};
pub use context::CallContext;
pub use error::ProbeError;
pub use options::{ClientOptions, RetryPolicy};
pub use policy::{BackoffConfig, ContextBackoff, ExponentialBackoff, TokioClock};
pub use request::RequestDescriptor;
pub use retry::RETRY_STATUS_FLOOR;
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ProbeError>;
