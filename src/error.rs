//! Error types for the CubeFS CSI driver
//!
//! Every failure in the driver is represented by [`Error`] and classified
//! into one of the four status classes the CSI surface reports to the
//! container orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the driver
#[derive(Error, Debug)]
pub enum Error {
    /// The caller supplied a missing or invalid request field. Never
    /// retried by the orchestrator.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A master endpoint was unreachable or returned a body that does not
    /// decode as the expected response schema.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The cluster reported a logical failure (non-zero result code) that
    /// is not one of the known idempotent cases.
    #[error("{operation} failed: master code {code}: {msg}")]
    Cluster {
        operation: &'static str,
        code: i32,
        msg: String,
    },

    /// The operation is a deliberate API-surface boundary and is not
    /// provided by this plugin.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Status class reported over the protocol surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusClass {
    InvalidArgument,
    Unavailable,
    Internal,
    Unimplemented,
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusClass::InvalidArgument => write!(f, "InvalidArgument"),
            StatusClass::Unavailable => write!(f, "Unavailable"),
            StatusClass::Internal => write!(f, "Internal"),
            StatusClass::Unimplemented => write!(f, "Unimplemented"),
        }
    }
}

impl Error {
    /// Map this error onto its protocol status class
    pub fn class(&self) -> StatusClass {
        match self {
            Error::InvalidArgument(_) => StatusClass::InvalidArgument,
            Error::Unavailable(_) => StatusClass::Unavailable,
            Error::Unimplemented(_) => StatusClass::Unimplemented,
            Error::Cluster { .. } | Error::Internal(_) | Error::Io(_) | Error::Json(_) => {
                StatusClass::Internal
            }
        }
    }

    /// Whether the orchestrator may safely retry the failed call.
    ///
    /// Input errors and unimplemented operations never change on retry;
    /// everything else is transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.class(),
            StatusClass::InvalidArgument | StatusClass::Unimplemented
        )
    }
}

/// Result type alias for the driver
pub type Result<T> = std::result::Result<T, Error>;
