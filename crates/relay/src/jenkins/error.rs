//! Jenkins-related errors.

use thiserror::Error;

/// Errors returned by [`JenkinsClient`](super::JenkinsClient).
///
/// Every variant names the remote operation that failed.
#[derive(Debug, Error)]
pub enum JenkinsError {
    /// HTTP request failed before a response arrived.
    #[error("Jenkins {operation} request failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The job, build or queue item does not exist.
    #[error("Jenkins {operation}: not found")]
    NotFound { operation: &'static str },

    /// Credentials were rejected or lack the required permission.
    #[error("Jenkins {operation}: unauthorized (HTTP {status})")]
    Unauthorized {
        operation: &'static str,
        status: u16,
    },

    /// Jenkins answered with an unexpected status.
    #[error("Jenkins {operation}: HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be parsed.
    #[error("Jenkins {operation}: invalid response: {message}")]
    Response {
        operation: &'static str,
        message: String,
    },
}

impl JenkinsError {
    /// Name of the remote operation that failed.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Request { operation, .. }
            | Self::NotFound { operation }
            | Self::Unauthorized { operation, .. }
            | Self::Status { operation, .. }
            | Self::Response { operation, .. } => operation,
        }
    }

    /// Returns `true` if Jenkins reported the item as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Chat-safe description of the failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { operation } => {
                format!("Jenkins couldn't find what was requested ({operation}). Please check the job name and build number.")
            }
            Self::Unauthorized { operation, .. } => format!(
                "Jenkins rejected your credentials for {operation}. Check your permissions or reconnect with `/jenkins connect`."
            ),
            Self::Request { operation, .. } => {
                format!("Couldn't reach the Jenkins server to {operation}. Please try again later.")
            }
            Self::Status { operation, .. } | Self::Response { operation, .. } => {
                format!("Error while trying to {operation} on Jenkins.")
            }
        }
    }
}
