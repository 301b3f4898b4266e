use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method,
};
use serde::Serialize;

use crate::{ProbeError, Result};

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";

/// One logical request, replayed unchanged on every retry attempt.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Adds or replaces a header. `Content-Type` is always sent as JSON
    /// regardless of what is set here.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| ProbeError::Config(format!("invalid header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| ProbeError::Config(format!("invalid value for header '{name}': {err}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the JSON payload.
    ///
    /// A payload that fails to serialize is logged and replaced by an empty
    /// body; use [`RequestDescriptor::try_json`] to fail instead.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Self {
        match serde_json::to_vec(payload) {
            Ok(body) => self.body(body),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("could not encode input payload: {_err}");
                self.body(Bytes::new())
            }
        }
    }

    pub fn try_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| ProbeError::Config(format!("could not encode input payload: {err}")))?;
        Ok(self.body(body))
    }

    /// Sets an already-encoded payload.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Headers as sent on the wire, with `Content-Type` forced to JSON.
    pub fn wire_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers
    }
}
