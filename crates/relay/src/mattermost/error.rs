//! Mattermost-related errors.

use thiserror::Error;

/// Errors that can occur when calling the Mattermost REST API.
#[derive(Debug, Error)]
pub enum MattermostError {
    /// HTTP request failed.
    #[error("Mattermost request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Mattermost response error: {0}")]
    Response(String),

    /// Mattermost returned an error status.
    #[error("Mattermost API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}
