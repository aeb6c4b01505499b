//! Errors of the reconciliation engine.
//!
//! Commands wrap these in `anyhow` with context; the engine and resources
//! keep them typed so callers can tell absence, terminal failure and
//! timeouts apart.

use std::path::PathBuf;
use std::time::Duration;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Desired state is invalid; nothing was sent.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A control-plane call failed.
    #[error("{}", describe_transport(.operation, .source))]
    Transport {
        operation: &'static str,
        #[source]
        source: faaskit::Error,
    },

    /// The function does not exist remotely.
    #[error("function {id} not found")]
    NotFound { id: String },

    /// The rollout reached a terminal failure.
    #[error("function {id} deployment failed: {message}")]
    DeploymentFailed { id: String, message: String },

    /// The deadline passed before the function converged.
    #[error(
        "timed out after {}s waiting for function {id} to be {target} (last status: {last_status})",
        .elapsed.as_secs()
    )]
    Timeout {
        id: String,
        target: &'static str,
        elapsed: Duration,
        last_status: String,
    },

    /// The run was aborted while waiting.
    #[error("cancelled while waiting for function {id}")]
    Cancelled { id: String },

    /// The code directory could not be packed.
    #[error("failed to build archive from {}: {message}", .path.display())]
    Archive { path: PathBuf, message: String },

    /// A local file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state store could not record a change.
    #[error("failed to record state: {0}")]
    State(String),
}

/// HTTP errors already name the operation; everything else gets it prepended.
fn describe_transport(operation: &str, source: &faaskit::Error) -> String {
    match source {
        faaskit::Error::Http { .. } => source.to_string(),
        _ => format!("failed to {operation}: {source}"),
    }
}

impl ProviderError {
    /// Wrap a transport error with the operation it belongs to.
    ///
    /// Meant for `map_err`: `.map_err(ProviderError::transport("create function"))`.
    pub fn transport(operation: &'static str) -> impl FnOnce(faaskit::Error) -> Self {
        move |source| Self::Transport { operation, source }
    }

    /// Whether this error signals absence rather than failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
