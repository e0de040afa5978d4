//! Error types
//!
//! Every failure halts the deploy. Nothing here is retried; the read call is
//! idempotent so the orchestration engine's own re-apply stays safe.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or resolving a resource graph
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed input detected while building the graph
    #[error("construction error: {0}")]
    Construction(String),

    #[error("duplicate resource id: {0}")]
    DuplicateResource(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("resource {resource} has no output attribute '{attribute}'")]
    UnknownAttribute { resource: String, attribute: String },

    #[error("dependency cycle involving resource: {0}")]
    Cycle(String),

    /// The read call failed or returned an error status
    #[error("resolution of '{query}' failed: {message}")]
    Resolution { query: String, message: String },

    /// A declared field path is absent from the read response
    #[error("resolution of '{query}' failed: field '{path}' missing from response")]
    MissingField { query: String, path: String },

    #[error("resolution of '{query}' timed out after {}s", .timeout.as_secs())]
    Timeout { query: String, timeout: Duration },

    /// A value was needed before the step producing it had run
    #[error("unresolved value: {0}")]
    Unresolved(String),

    /// The attached policy did not authorize the read action
    #[error("permission denied for '{query}': {message}")]
    Permission { query: String, message: String },
}

/// Broad classification used when reporting to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Construction,
    Resolution,
    Permission,
}

impl Error {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn resolution(query: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Resolution {
            query: query.into(),
            message: msg.into(),
        }
    }

    pub fn permission(query: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Permission {
            query: query.into(),
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Construction(_)
            | Error::DuplicateResource(_)
            | Error::UnknownResource(_)
            | Error::UnknownAttribute { .. }
            | Error::Cycle(_) => ErrorKind::Construction,
            Error::Resolution { .. }
            | Error::MissingField { .. }
            | Error::Timeout { .. }
            | Error::Unresolved(_) => ErrorKind::Resolution,
            Error::Permission { .. } => ErrorKind::Permission,
        }
    }

    /// Logical identity of the failing read query, if any
    pub fn query(&self) -> Option<&str> {
        match self {
            Error::Resolution { query, .. }
            | Error::MissingField { query, .. }
            | Error::Timeout { query, .. }
            | Error::Permission { query, .. } => Some(query),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
