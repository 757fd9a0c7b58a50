//! Error taxonomy for remote catalog calls.

use std::time::Duration;

use thiserror::Error;

use modsync_core::error::{AppError, ErrorKind};

/// Classified failure of a remote call.
///
/// Cloneable so a single coalesced result can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Deadline or network timeout.
    #[error("catalog request timed out")]
    Timeout,

    /// The caller or the client gave up before a result arrived.
    #[error("catalog request canceled")]
    Canceled,

    /// HTTP 429, optionally with the server's requested delay.
    #[error("catalog rate limit exceeded")]
    RateLimited {
        /// Parsed `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// 5xx response, or the server could not be reached at all.
    #[error("catalog server error: {message}")]
    ServerError {
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
        /// Diagnostic text.
        message: String,
    },

    /// 4xx response other than 429.
    #[error("catalog rejected request ({status}): {message}")]
    ClientError {
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("malformed catalog response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether another attempt within the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited { .. } | Self::ServerError { .. }
        )
    }

    /// Delay the server asked for, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this is a 404 from the catalog.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ClientError { status: 404, .. })
    }

    /// The application error kind this failure maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout => ErrorKind::Timeout,
            Self::Canceled => ErrorKind::Canceled,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::ServerError { .. } => ErrorKind::ServerError,
            Self::ClientError { .. } => ErrorKind::ClientError,
            Self::Decode(_) => ErrorKind::Serialization,
        }
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        AppError::with_source(err.kind(), err.to_string(), err)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::ServerError {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
