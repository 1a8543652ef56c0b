//! Error types for service calls.
//!
//! # Design
//! `CallError` is the single error surfaced by `Service::call`. Each variant
//! maps to one failure class so callers can branch on it: bad configuration,
//! a malformed request, a transport that could not be reached, a payload that
//! could not be decoded, a decorator that rejected the payload, a fan-out that
//! matched nothing, and a keyed lookup that found nothing.
//!
//! Collaborator errors (`FsError`, `SessionError`) stay distinct so that the
//! filesystem and remote-session traits can be implemented without knowing
//! about `CallError`; transports wrap them into `Connectivity`.

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause carried by `CallError::Connectivity`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by services, interpreters and transports.
#[derive(Debug, Error)]
pub enum CallError {
    /// `config()` input was rejected. Nothing was applied.
    #[error("invalid configuration: {}", join(.errors))]
    Configuration { errors: Vec<String> },

    /// The request was rejected before any I/O took place.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The backend could not be reached or the resource could not be retrieved.
    #[error("could not connect to or retrieve from {target}: {message}")]
    Connectivity {
        target: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The payload could not be decoded in the declared format.
    #[error("could not interpret {format} payload: {reason}")]
    Interpretation { format: &'static str, reason: String },

    /// A validation decorator rejected the raw payload or the response.
    #[error("validation failed: {}", join(.errors))]
    Validation { errors: Vec<String> },

    /// A multi-source retrieval matched no resource.
    #[error("no resource matched '{pattern}'")]
    EmptyRetrieval { pattern: String },

    /// A keyed lookup found nothing.
    #[error("'{key}' is not in the collection")]
    NotInCollection { key: String },
}

impl CallError {
    pub fn configuration(errors: Vec<String>) -> Self {
        Self::Configuration { errors }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Connectivity failure that keeps the underlying cause.
    pub fn connectivity(
        target: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connectivity {
            target: target.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Connectivity failure with no underlying error value (e.g. a SOAP fault).
    pub fn connectivity_message(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn interpretation(format: &'static str, reason: impl fmt::Display) -> Self {
        Self::Interpretation {
            format,
            reason: reason.to_string(),
        }
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    pub fn empty_retrieval(pattern: impl Into<String>) -> Self {
        Self::EmptyRetrieval {
            pattern: pattern.into(),
        }
    }

    pub fn not_in_collection(key: impl Into<String>) -> Self {
        Self::NotInCollection { key: key.into() }
    }

    /// Messages carried by `Validation` and `Configuration`; empty otherwise.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation { errors } | Self::Configuration { errors } => errors,
            _ => &[],
        }
    }
}

fn join(errors: &[String]) -> String {
    errors.join("; ")
}

/// Errors raised by a `Filesystem` implementation.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// Any other I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Classify an `io::Error`, splitting out `NotFound`.
    pub fn from_io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Errors raised by a `RemoteSession` implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The host presented a key whose fingerprint differs from the expected one.
    #[error("host fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    /// Authentication was refused.
    #[error("authentication failed for user {user}")]
    Authentication { user: String },

    /// Any other session or transfer failure.
    #[error("{0}")]
    Transfer(String),

    /// Local side of a transfer failed.
    #[error(transparent)]
    Local(#[from] FsError),
}
