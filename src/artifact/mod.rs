//! Artifact server validation built on [`HttpClient`](crate::HttpClient).
//!
//! An [`ArtifactRequest`] names an artifact type, an operation and
//! type-specific parameters. [`ArtifactHandler::from_request`] resolves the
//! handler once; [`ArtifactHandler::apply`] runs the operation.

mod docker;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CallContext, ProbeError, Result};

pub use docker::{
    AuthType, DockerArtifactParams, DockerClient, DockerHandler, ProviderType,
    API_VERSION_ENDPOINT,
};

/// Kind of artifact server a request targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactType {
    DockerRegistry,
    Other(String),
}

impl From<String> for ArtifactType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DockerRegistry" => Self::DockerRegistry,
            _ => Self::Other(value),
        }
    }
}

impl From<ArtifactType> for String {
    fn from(value: ArtifactType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DockerRegistry => f.write_str("DockerRegistry"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// Operation to run against an artifact server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactOperation {
    Validate,
    Other(String),
}

impl From<String> for ArtifactOperation {
    fn from(value: String) -> Self {
        match value.as_str() {
            "VALIDATE" => Self::Validate,
            _ => Self::Other(value),
        }
    }
}

impl From<ArtifactOperation> for String {
    fn from(value: ArtifactOperation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ArtifactOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validate => f.write_str("VALIDATE"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// Operator request: which artifact server, what to do, and how to reach it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactRequest {
    pub artifact_type: ArtifactType,
    pub artifact_operation: ArtifactOperation,
    #[serde(default)]
    pub artifact_params: serde_json::Value,
}

impl ArtifactRequest {
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|err| ProbeError::Config(format!("invalid payload: {err}")))
    }

    /// Resolves the handler for this request and applies its operation.
    pub async fn execute(&self, ctx: &CallContext) -> Result<ValidationResponse> {
        let handler = ArtifactHandler::from_request(self)?;
        handler.apply(ctx, &self.artifact_operation).await
    }
}

/// Handler for one artifact server, chosen by [`ArtifactType`].
#[derive(Debug)]
pub enum ArtifactHandler {
    Docker(DockerHandler),
}

impl ArtifactHandler {
    pub fn from_request(request: &ArtifactRequest) -> Result<Self> {
        match &request.artifact_type {
            ArtifactType::DockerRegistry => {
                Ok(Self::Docker(DockerHandler::new(&request.artifact_params)?))
            }
            other => Err(ProbeError::Unsupported(format!(
                "unsupported artifact type [{other}]"
            ))),
        }
    }

    pub async fn apply(
        &self,
        ctx: &CallContext,
        operation: &ArtifactOperation,
    ) -> Result<ValidationResponse> {
        match operation {
            ArtifactOperation::Validate => self.validate(ctx).await,
            other => Err(ProbeError::Unsupported(format!(
                "unsupported artifact operation [{other}]"
            ))),
        }
    }

    pub async fn validate(&self, ctx: &CallContext) -> Result<ValidationResponse> {
        match self {
            Self::Docker(handler) => handler.validate(ctx).await,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub code: i32,
}

/// Result of validating an artifact server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub status: ValidationStatus,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    #[serde(default)]
    pub error_summary: String,
}

impl ValidationResponse {
    pub fn success() -> Self {
        Self {
            status: ValidationStatus::Success,
            errors: Vec::new(),
            error_summary: String::new(),
        }
    }

    pub fn failure(err: &ProbeError) -> Self {
        let message = err.to_string();
        Self {
            status: ValidationStatus::Failure,
            errors: vec![ErrorDetail {
                message: message.clone(),
                reason: String::new(),
                code: err.status().map(|status| status.as_u16().into()).unwrap_or_default(),
            }],
            error_summary: message,
        }
    }
}
