//! Error types for control-plane API calls.
//!
//! Errors are categorized so callers can tell the one recoverable outcome,
//! "the entity does not exist", apart from everything else.

use std::fmt;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The entity does not exist (HTTP 404).
    NotFound,
    /// The API answered with an unexpected status code.
    Http,
    /// The request never got a response (DNS, connect, TLS, timeout).
    Network,
    /// The response body could not be decoded.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::Http => "API request rejected",
            Self::Network => "Network connectivity issue",
            Self::Format => "Invalid API response",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "The resource may have been deleted outside of faasform",
            Self::Http => "Check the response body and your credentials",
            Self::Network => "Check the API endpoint and your internet connection",
            Self::Format => "The API may have changed; check for a newer faasform release",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the control plane.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind ("function", "secret").
        kind: &'static str,
        /// Identity that was looked up.
        id: String,
    },

    /// The API answered with a non-success status.
    #[error("failed to {operation}: status={status}, body={body}")]
    Http {
        /// Operation that failed, e.g. "create function".
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnosis.
        body: String,
    },

    /// Transport-level failure before a response was received.
    #[error("failed to execute request: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    InvalidResponse(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP status error.
    pub fn http(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Create a not-found error for a function.
    pub fn function_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "function",
            id: id.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Http { .. } => ErrorCategory::Http,
            Error::Network(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error means the entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
