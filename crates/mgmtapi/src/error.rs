//! Error types for management API operations.
//!
//! Every failure is surfaced to the immediate caller with full context. The
//! engine never retries; [`ErrorCategory::advice`] tells the user what to
//! check next.

use declarative::LifecycleError;
use std::fmt;

/// Result type alias for management API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No usable configuration (missing domain or credentials).
    Configuration,
    /// Network, TLS or IO failure.
    Network,
    /// The remote service answered with an unexpected status.
    Rejected,
    /// A successful response could not be decoded.
    Decode,
    /// Remote data violates an invariant the engine relies on.
    Consistency,
    /// An operation was invoked in the wrong lifecycle state.
    Lifecycle,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration problem",
            Self::Network => "Network connectivity issue",
            Self::Rejected => "Request rejected by the management API",
            Self::Decode => "Unexpected response format",
            Self::Consistency => "Inconsistent remote data",
            Self::Lifecycle => "Invalid resource lifecycle transition",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "Supply a domain and either an access token or both a client id and client secret"
            }
            Self::Network => "Check your network connection and the domain, then try again",
            Self::Rejected => "Inspect the status and response body for the reason",
            Self::Decode => "Verify the domain points at a compatible management API",
            Self::Consistency => "Remove the duplicate or foreign object remotely, then re-run",
            Self::Lifecycle => "Check the state file for stale or missing identities",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while authenticating or reconciling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable configuration was supplied. Raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be completed (connect, TLS, timeout, body read).
    #[error("transport error for {url}: {source}")]
    Transport {
        /// Request URL.
        url: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The token endpoint answered with a non-2xx status.
    #[error("authentication rejected (HTTP {status}): {body}")]
    AuthRejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A create did not answer 201.
    #[error("{kind} create rejected (HTTP {status}): {body}")]
    CreateRejected {
        /// Resource kind.
        kind: &'static str,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A read failed with a status that does not mean "absent".
    #[error("{kind} read failed (HTTP {status}): {body}")]
    ReadFailed {
        /// Resource kind.
        kind: &'static str,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// An update did not answer 200.
    #[error("{kind} update rejected (HTTP {status}): {body}")]
    UpdateRejected {
        /// Resource kind.
        kind: &'static str,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A delete did not answer 204.
    #[error("{kind} delete rejected (HTTP {status}): {body}")]
    DeleteRejected {
        /// Resource kind.
        kind: &'static str,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A 2xx body did not have the expected shape.
    #[error("could not decode {context}: {message}")]
    Decode {
        /// What was being decoded.
        context: String,
        /// Parser message.
        message: String,
    },

    /// More than one grant exists for a client and audience.
    #[error("{count} grants found for client {client_id} and audience {audience}: {body}")]
    DuplicateResource {
        /// Client the grants belong to.
        client_id: String,
        /// Audience the grants target.
        audience: String,
        /// Number of matching records.
        count: usize,
        /// Raw response body.
        body: String,
    },

    /// A read returned a record with a different identity than requested.
    #[error("{kind} identity mismatch: expected {expected}, found {actual}")]
    IdentityMismatch {
        /// Resource kind.
        kind: &'static str,
        /// Recorded identity.
        expected: String,
        /// Identity the service returned.
        actual: String,
    },

    /// An operation was invoked in the wrong lifecycle state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a transport error.
    pub fn transport(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Transport { .. } => ErrorCategory::Network,
            Self::AuthRejected { .. }
            | Self::CreateRejected { .. }
            | Self::ReadFailed { .. }
            | Self::UpdateRejected { .. }
            | Self::DeleteRejected { .. } => ErrorCategory::Rejected,
            Self::Decode { .. } => ErrorCategory::Decode,
            Self::DuplicateResource { .. } | Self::IdentityMismatch { .. } => {
                ErrorCategory::Consistency
            }
            Self::Lifecycle(_) => ErrorCategory::Lifecycle,
        }
    }

    /// HTTP status of a rejected response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthRejected { status, .. }
            | Self::CreateRejected { status, .. }
            | Self::ReadFailed { status, .. }
            | Self::UpdateRejected { status, .. }
            | Self::DeleteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body carried by the error, verbatim.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::AuthRejected { body, .. }
            | Self::CreateRejected { body, .. }
            | Self::ReadFailed { body, .. }
            | Self::UpdateRejected { body, .. }
            | Self::DeleteRejected { body, .. }
            | Self::DuplicateResource { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Transport {
            url: String::new(),
            source: Box::new(err),
        }
    }
}
