//! Error types for the Azure backend.

use serde::Deserialize;
use thiserror::Error;

use crate::error::{FatalCause, ProvisionError, Stage};

/// Error reported by Azure Resource Manager or by the transport reaching it.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{}", render(.status, .code, .message))]
pub struct ArmError {
    /// HTTP status, absent when the request never got a reply.
    pub status: Option<u16>,
    /// ARM error code (for example `ResourceGroupNotFound`).
    pub code: String,
    /// Message returned by ARM or by the HTTP client.
    pub message: String,
}

fn render(status: &Option<u16>, code: &str, message: &str) -> String {
    match status {
        Some(status) => format!("ARM returned {status} {code}: {message}"),
        None => format!("{code}: {message}"),
    }
}

/// Coarse classification of an [`ArmError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArmErrorKind {
    /// The resource does not exist.
    NotFound,
    /// Credentials were rejected or lack permission.
    Unauthorized,
    /// Subscription quota or request rate exhausted.
    QuotaExceeded,
    /// The request was rejected as malformed.
    InvalidInput,
    /// The request never got a usable reply.
    Transport,
    /// Anything else.
    Other,
}

/// Code used for errors produced before ARM answered.
pub(crate) const TRANSPORT_CODE: &str = "Transport";
/// Code used when ARM answered with a body that could not be read.
pub(crate) const INVALID_RESPONSE_CODE: &str = "InvalidResponse";

impl ArmError {
    /// Builds an error from an HTTP status and the ARM error envelope.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope { error }) => Self {
                status: Some(status),
                code: error.code,
                message: error.message,
            },
            Err(_) => Self {
                status: Some(status),
                code: String::from("Unknown"),
                message: String::from_utf8_lossy(body).trim().to_owned(),
            },
        }
    }

    /// Builds an error for a request that never produced a usable reply.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: TRANSPORT_CODE.to_owned(),
            message: message.into(),
        }
    }

    /// Builds an error for a long-running operation that ended in `state`.
    ///
    /// The operation's own error body wins when ARM supplied one.
    #[must_use]
    pub fn operation_failed(state: &str, body: Option<ErrorBody>) -> Self {
        let body = body.unwrap_or_default();
        Self {
            status: None,
            code: if body.code.is_empty() {
                state.to_owned()
            } else {
                body.code
            },
            message: if body.message.is_empty() {
                format!("operation ended in state {state}")
            } else {
                body.message
            },
        }
    }

    /// Classifies the error by status first and ARM code second.
    #[must_use]
    pub fn kind(&self) -> ArmErrorKind {
        let code = self.code.as_str();
        match self.status {
            None => ArmErrorKind::Transport,
            _ if code == INVALID_RESPONSE_CODE => ArmErrorKind::Transport,
            Some(404) => ArmErrorKind::NotFound,
            Some(401 | 403) => ArmErrorKind::Unauthorized,
            Some(429) => ArmErrorKind::QuotaExceeded,
            _ if matches!(code, "ResourceNotFound" | "ResourceGroupNotFound") => {
                ArmErrorKind::NotFound
            }
            _ if code == "AuthorizationFailed" || code.starts_with("InvalidAuthenticationToken") => {
                ArmErrorKind::Unauthorized
            }
            _ if code.contains("Quota") => ArmErrorKind::QuotaExceeded,
            Some(400) => ArmErrorKind::InvalidInput,
            _ if code.starts_with("Invalid") || code.starts_with("BadRequest") => {
                ArmErrorKind::InvalidInput
            }
            _ => ArmErrorKind::Other,
        }
    }

    /// Whether ARM reported the resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ArmErrorKind::NotFound
    }

    /// Maps the error into the shared taxonomy for the given stage.
    ///
    /// Absence is only meaningful to callers for `status` and `delete`, so a
    /// not-found reply at any other stage is treated as fatal.
    #[must_use]
    pub fn into_provision_error(self, stage: Stage, id: &str) -> ProvisionError {
        let cause = match self.kind() {
            ArmErrorKind::NotFound if matches!(stage, Stage::StatusQuery | Stage::Teardown) => {
                return ProvisionError::NotFound { id: id.to_owned() };
            }
            ArmErrorKind::Unauthorized => FatalCause::Unauthorized,
            ArmErrorKind::QuotaExceeded => FatalCause::QuotaExceeded,
            ArmErrorKind::InvalidInput => FatalCause::InvalidInput,
            ArmErrorKind::Transport => FatalCause::Transport,
            ArmErrorKind::NotFound | ArmErrorKind::Other => FatalCause::Unclassified,
        };
        ProvisionError::fatal(stage, cause, self)
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorBody,
}

/// Code and message of an ARM error, also embedded in operation status.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ErrorBody {
    /// ARM error code.
    #[serde(default)]
    pub code: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}
