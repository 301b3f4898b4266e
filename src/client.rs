use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::{redirect, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    body::{ResponseBody, DRAIN_WINDOW},
    CallContext, ClientOptions, ProbeError, RequestDescriptor, Result,
};

/// Result of a single request/response exchange.
///
/// `status` is `None` when the transport failed before a response arrived.
/// `error` is `None` only for a successful exchange.
#[derive(Debug)]
pub struct Outcome<T = ()> {
    pub status: Option<StatusCode>,
    pub body: Bytes,
    pub value: Option<T>,
    pub error: Option<ProbeError>,
}

impl<T> Outcome<T> {
    pub(crate) fn failed(error: ProbeError) -> Self {
        Self {
            status: None,
            body: Bytes::new(),
            value: None,
            error: Some(error),
        }
    }

    fn response(status: StatusCode, body: Bytes, error: Option<ProbeError>) -> Self {
        Self {
            status: Some(status),
            body,
            value: None,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Decoded value on success, the exchange error otherwise.
    ///
    /// A successful exchange without a decoded value (204, or no decode
    /// requested) yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }

    pub(crate) fn with_error(mut self, error: ProbeError) -> Self {
        self.error = Some(error);
        self
    }

    /// Keeps the error, drops whatever response was received.
    pub(crate) fn without_response(self) -> Self {
        match self.error {
            Some(err) => Self::failed(err),
            None => Self {
                status: None,
                body: Bytes::new(),
                value: None,
                error: None,
            },
        }
    }
}

#[derive(Clone)]
/// HTTP client bound to one API endpoint.
///
/// Redirects are never followed; a 3xx response is surfaced as a status error.
pub struct HttpClient {
    http: reqwest::Client,
    endpoint: String,
    options: ClientOptions,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .finish()
    }
}

impl HttpClient {
    /// Creates a client with default [`ClientOptions`].
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_options(endpoint, ClientOptions::default())
    }

    pub fn with_options(endpoint: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|err| ProbeError::Config(format!("could not build http client: {err}")))?;
        Ok(Self {
            http,
            endpoint: normalize_endpoint(endpoint.into()),
            options,
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `PROBE_ENDPOINT` — base URL requests are resolved against
    /// - `PROBE_INSECURE` — optional; `true` or `1` skips TLS verification
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("PROBE_ENDPOINT").map_err(|_| {
            ProbeError::Config("missing PROBE_ENDPOINT environment variable".to_owned())
        })?;
        if endpoint.trim().is_empty() {
            return Err(ProbeError::Config(
                "PROBE_ENDPOINT is set but empty".to_owned(),
            ));
        }
        let insecure = std::env::var("PROBE_INSECURE")
            .map(|value| matches!(value.trim(), "1" | "true" | "TRUE"))
            .unwrap_or(false);
        Self::with_options(
            endpoint,
            ClientOptions {
                accept_invalid_certs: insecure,
                ..ClientOptions::default()
            },
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends one request without decoding the response body.
    pub async fn send(&self, ctx: &CallContext, request: &RequestDescriptor) -> Outcome {
        self.exchange(ctx, request, false).await
    }

    /// Sends one request and decodes a successful JSON body into `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
    ) -> Outcome<T> {
        self.exchange(ctx, request, true).await
    }

    pub(crate) async fn exchange<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
        decode: bool,
    ) -> Outcome<T> {
        let url = format!("{}{}", self.endpoint, request.path());
        let pending = self
            .http
            .request(request.method().clone(), url)
            .headers(request.wire_headers())
            .timeout(Duration::from_millis(self.options.timeout_ms))
            .body(request.body_bytes().clone())
            .send();

        let response = tokio::select! {
            biased;
            err = ctx.done() => return Outcome::failed(err),
            response = pending => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(err) => return Outcome::failed(ProbeError::Transport(err)),
        };

        let status = response.status();
        let mut body = ResponseBody::new(Box::pin(response.bytes_stream()));
        consume(ctx, status, &mut body, decode, self.options.max_body_bytes).await
    }
}

/// Turns a received response into an [`Outcome`], then drains what is left
/// of the body on every path.
pub(crate) async fn consume<S, E, T>(
    ctx: &CallContext,
    status: StatusCode,
    body: &mut ResponseBody<S>,
    decode: bool,
    max_body_bytes: usize,
) -> Outcome<T>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<ProbeError>,
    T: DeserializeOwned,
{
    let outcome = settle(ctx, status, body, decode, max_body_bytes).await;

    if !ctx.is_done() {
        if let Err(_err) = body.drain(DRAIN_WINDOW).await {
            #[cfg(feature = "tracing")]
            tracing::error!("could not drain response body: {_err}");
        }
    }
    outcome
}

async fn settle<S, E, T>(
    ctx: &CallContext,
    status: StatusCode,
    body: &mut ResponseBody<S>,
    decode: bool,
    max_body_bytes: usize,
) -> Outcome<T>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<ProbeError>,
    T: DeserializeOwned,
{
    // No content: nothing to read or decode, and never an error.
    if status == StatusCode::NO_CONTENT {
        return Outcome::response(status, Bytes::new(), None);
    }

    // Error bodies are only message text: keep a prefix and always report the status.
    if status.as_u16() > 299 {
        let read = tokio::select! {
            biased;
            err = ctx.done() => Err(err),
            read = body.read_prefix(max_body_bytes) => read,
        };
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(err) if err.is_cancellation() => {
                return Outcome::response(status, Bytes::new(), Some(err))
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::error!(%status, "could not read error body: {_err}");
                Bytes::new()
            }
        };
        let err = ProbeError::from_status(status, &bytes);
        return Outcome::response(status, bytes, Some(err));
    }

    let read = tokio::select! {
        biased;
        err = ctx.done() => Err(err),
        read = body.read_all(max_body_bytes) => read,
    };
    let bytes = match read {
        Ok(bytes) => bytes,
        Err(err) => return Outcome::response(status, Bytes::new(), Some(err)),
    };

    if !decode {
        return Outcome::response(status, bytes, None);
    }
    match serde_json::from_slice::<T>(&bytes) {
        Ok(value) => Outcome {
            status: Some(status),
            body: bytes,
            value: Some(value),
            error: None,
        },
        Err(err) => {
            let err = ProbeError::Decode(format!("invalid response JSON: {err}"));
            Outcome::response(status, bytes, Some(err))
        }
    }
}

fn normalize_endpoint(endpoint: String) -> String {
    endpoint.trim().trim_end_matches('/').to_owned()
}
