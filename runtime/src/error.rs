//! Error types for the command layer.

use mise_core::lifecycle::IllegalTransition;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an upstream collaborator (order API, payment gateway).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The collaborator understood the request and refused it
    #[error("Upstream rejected the request: {0}")]
    Rejected(String),

    /// The collaborator could not be reached or failed internally
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

/// Why a command appended nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The guard forbids the command, either before the upstream call or
    /// when re-checked just before appending
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// The upstream call failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The upstream call did not finish within the configured bound
    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),
}

impl CommandError {
    /// Label used for the `outcome` dimension of command metrics.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::IllegalTransition(_) => "illegal_transition",
            Self::Upstream(_) => "upstream_error",
            Self::Timeout(_) => "timeout",
        }
    }
}
