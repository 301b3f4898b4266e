use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use super::ValidationResponse;
use crate::{CallContext, HttpClient, ProbeError, RequestDescriptor, Result, RetryPolicy};

/// Registry API version check endpoint.
pub const API_VERSION_ENDPOINT: &str = "/v2/";

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);
const VALIDATE_RETRIES: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    DockerHub,
    Other(String),
    #[default]
    Unset,
}

impl From<String> for ProviderType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::Unset,
            "DockerHub" => Self::DockerHub,
            _ => Self::Other(value),
        }
    }
}

impl From<ProviderType> for String {
    fn from(value: ProviderType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DockerHub => f.write_str("DockerHub"),
            Self::Other(value) => f.write_str(value),
            Self::Unset => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthType {
    UsernamePassword,
    Anonymous,
    Other(String),
    #[default]
    Unset,
}

impl From<String> for AuthType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::Unset,
            "UsernamePassword" => Self::UsernamePassword,
            "Anonymous" => Self::Anonymous,
            _ => Self::Other(value),
        }
    }
}

impl From<AuthType> for String {
    fn from(value: AuthType) -> Self {
        match value {
            AuthType::UsernamePassword => "UsernamePassword".to_owned(),
            AuthType::Anonymous => "Anonymous".to_owned(),
            AuthType::Other(value) => value,
            AuthType::Unset => String::new(),
        }
    }
}

/// Connection parameters for a Docker registry.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerArtifactParams {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for DockerArtifactParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerArtifactParams")
            .field("url", &self.url)
            .field("provider_type", &self.provider_type)
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DockerArtifactParams {
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| Err(ProbeError::Config(format!("{field} is empty")));
        if self.url.trim().is_empty() {
            return missing("url");
        }
        if self.provider_type == ProviderType::Unset {
            return missing("providerType");
        }
        if self.auth_type == AuthType::Unset {
            return missing("authType");
        }
        if self.auth_type == AuthType::UsernamePassword {
            if self.username.is_empty() {
                return missing("username");
            }
            if self.password.is_empty() {
                return missing("password");
            }
        }
        Ok(())
    }
}

/// Registry client that probes the `/v2/` endpoint.
#[derive(Clone)]
pub struct DockerClient {
    http: HttpClient,
    credentials: Option<(String, String)>,
}

impl fmt::Debug for DockerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerClient")
            .field("http", &self.http)
            .field("username", &self.credentials.as_ref().map(|(user, _)| user))
            .finish()
    }
}

impl DockerClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            credentials: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Checks that the registry answers its API version endpoint with the
    /// configured credentials.
    pub async fn validate(&self, ctx: &CallContext) -> Result<()> {
        let request = self.version_request()?;
        let mut backoff = self.http.create_backoff(ctx, VALIDATE_TIMEOUT);
        self.http
            .retry(ctx, &request, &mut backoff, RetryPolicy::new(VALIDATE_RETRIES))
            .await
            .into_result()
            .map(|_| ())
    }

    fn version_request(&self) -> Result<RequestDescriptor> {
        let request = RequestDescriptor::get(API_VERSION_ENDPOINT);
        match &self.credentials {
            Some((username, password)) => {
                request.header(AUTHORIZATION.as_str(), &basic_authorization(username, password))
            }
            None => Ok(request),
        }
    }
}

/// Validates Docker registries described by [`DockerArtifactParams`].
#[derive(Debug)]
pub struct DockerHandler {
    params: DockerArtifactParams,
    client: DockerClient,
}

impl DockerHandler {
    pub fn new(artifact_params: &serde_json::Value) -> Result<Self> {
        let params = DockerArtifactParams::deserialize(artifact_params).map_err(|err| {
            ProbeError::Config(format!(
                "failed to decode artifact params into DockerArtifactParams: {err}"
            ))
        })?;
        Self::from_params(params)
    }

    pub fn from_params(params: DockerArtifactParams) -> Result<Self> {
        params
            .validate()
            .map_err(|err| ProbeError::Config(format!("invalid docker artifact params: {err}")))?;

        let mut client = DockerClient::new(HttpClient::new(&params.url)?);
        if params.auth_type != AuthType::Anonymous {
            client = client.with_basic_auth(&params.username, &params.password);
        }
        Ok(Self { params, client })
    }

    pub fn params(&self) -> &DockerArtifactParams {
        &self.params
    }

    /// Validates the registry. A reachable-but-failing registry is reported
    /// as a [`ValidationStatus::Failure`](super::ValidationStatus::Failure)
    /// response, not an error.
    pub async fn validate(&self, ctx: &CallContext) -> Result<ValidationResponse> {
        match &self.params.provider_type {
            ProviderType::DockerHub => match self.client.validate(ctx).await {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(url = %self.params.url, "successfully validated artifact server");
                    Ok(ValidationResponse::success())
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(url = %self.params.url, "failed validating artifact server: {err}");
                    Ok(ValidationResponse::failure(&err))
                }
            },
            other => Err(ProbeError::Unsupported(format!(
                "unsupported docker provider type [{other}]"
            ))),
        }
    }
}

fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
