//! Shared error taxonomy for every provisioning backend.
//!
//! Backends translate provider failures into [`ProvisionError`] so callers can
//! decide what to do from [`ProvisionError::kind`] alone: `NotReady` means poll
//! again later, `NotFound` means the resource is gone, `Cancelled` means the
//! caller's context ended the call, and everything else is fatal.

use std::fmt;

use thiserror::Error;

/// Boxed provider error kept as the source of a fatal failure.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Operation phase that failed, attached to fatal and cancelled errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    /// Fetching or creating-or-updating the grouping resource.
    GroupingResource,
    /// Submitting the compute resource create-or-update.
    ComputeResource,
    /// Waiting for the long-running operation to reach a terminal state.
    WaitForCompletion,
    /// Reading the final resource once the operation completed.
    ResultExtraction,
    /// Reading the current state of a resource for `status`.
    StatusQuery,
    /// Deleting the compute resource.
    Teardown,
}

impl Stage {
    /// Human readable stage label used in error messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GroupingResource => "grouping resource upsert",
            Self::ComputeResource => "compute resource create",
            Self::WaitForCompletion => "wait for completion",
            Self::ResultExtraction => "result extraction",
            Self::StatusQuery => "status query",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse reason behind a fatal backend failure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FatalCause {
    /// Credentials were rejected or lack permission.
    Unauthorized,
    /// The account ran out of quota for the requested resource.
    QuotaExceeded,
    /// The backend rejected the request as malformed (bad name, region, ...).
    InvalidInput,
    /// The request never reached the backend or its reply was unreadable.
    Transport,
    /// The long-running operation finished in a failed state.
    OperationFailed,
    /// Anything the classifier does not recognise.
    Unclassified,
}

impl fmt::Display for FatalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthorized => "unauthorized",
            Self::QuotaExceeded => "quota exceeded",
            Self::InvalidInput => "invalid input",
            Self::Transport => "transport",
            Self::OperationFailed => "operation failed",
            Self::Unclassified => "unclassified",
        };
        f.write_str(label)
    }
}

/// Classification consumed by reconcilers to pick a retry policy.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The addressed resource does not exist.
    NotFound,
    /// The resource exists but is still converging.
    NotReady,
    /// The caller's context was cancelled or its deadline passed.
    Cancelled,
    /// Retrying without changing something will not help.
    Fatal,
}

/// Raised when an opaque identifier cannot be encoded or decoded.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("malformed resource identifier '{id}': {reason}")]
pub struct IdentityError {
    /// The offending identifier (or the partial path being encoded).
    pub id: String,
    /// What is wrong with it.
    pub reason: String,
}

impl IdentityError {
    pub(crate) fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by [`crate::Provisioner`] implementations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Raised when a host is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// Raised when the provisioner cannot be configured.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when an identifier handed to `status` or `delete` is malformed.
    #[error(transparent)]
    MalformedIdentifier(#[from] IdentityError),
    /// Raised when the addressed resource does not exist.
    #[error("resource {id} not found")]
    NotFound {
        /// Identifier that was looked up.
        id: String,
    },
    /// Raised when the resource exists but is not usable yet.
    #[error("{resource} not ready [state: {state}, ip: {ip}]")]
    NotReady {
        /// Resource name.
        resource: String,
        /// Provisioning state reported by the backend.
        state: String,
        /// Address reported by the backend, empty when unassigned.
        ip: String,
    },
    /// Raised when the caller cancelled the call.
    #[error("{stage} cancelled by caller")]
    Cancelled {
        /// Phase that was interrupted.
        stage: Stage,
    },
    /// Raised when the caller's deadline or the wait timeout elapsed.
    #[error("{stage} exceeded its deadline")]
    DeadlineExceeded {
        /// Phase that was interrupted.
        stage: Stage,
    },
    /// Raised for every backend failure that retrying will not fix.
    #[error("{stage} failed ({cause}): {source}")]
    Fatal {
        /// Phase that failed.
        stage: Stage,
        /// Coarse classification of the failure.
        cause: FatalCause,
        /// Originating backend error.
        #[source]
        source: BoxedSource,
    },
}

impl ProvisionError {
    /// Wraps a backend failure with the stage that produced it.
    #[must_use]
    pub fn fatal(
        stage: Stage,
        cause: FatalCause,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fatal {
            stage,
            cause,
            source: Box::new(source),
        }
    }

    /// Returns the retry classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => ErrorKind::Cancelled,
            Self::Validation(_)
            | Self::Config(_)
            | Self::MalformedIdentifier(_)
            | Self::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// Whether polling `status` again may succeed without intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotReady)
    }

    /// Stage attached to the error, when there is one.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Cancelled { stage }
            | Self::DeadlineExceeded { stage }
            | Self::Fatal { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
