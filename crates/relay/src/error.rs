//! Unified error handling for the relay.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jenkins_relay_core::ParameterError;
use thiserror::Error;

use crate::jenkins::JenkinsError;
use crate::mattermost::MattermostError;
use crate::vault::VaultError;

/// Shown whenever stored credentials can't be used.
pub const CREDENTIALS_MESSAGE: &str =
    "Error fetching your Jenkins user info. Please run `/jenkins connect`.";

/// Application-level error type for the relay.
#[derive(Debug, Error)]
pub enum AppError {
    /// Stored credentials are missing or unreadable.
    #[error("Credential error: {0}")]
    Credentials(#[from] VaultError),

    /// A Jenkins call failed.
    #[error("Jenkins error: {0}")]
    Jenkins(#[from] JenkinsError),

    /// A Mattermost call failed.
    #[error("Mattermost error: {0}")]
    Mattermost(#[from] MattermostError),

    /// Submitted build parameters don't fit the job.
    #[error("Invalid build parameters: {0}")]
    Parameters(#[from] ParameterError),

    /// Request is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Chat-safe description of the error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Credentials(VaultError::NotFound) => {
                "Please connect your Jenkins account first with `/jenkins connect <username> <API Token>`."
                    .to_string()
            }
            Self::Credentials(_) => CREDENTIALS_MESSAGE.to_string(),
            Self::Jenkins(e) => e.user_message(),
            Self::Mattermost(_) => {
                "Something went wrong while handling the command.".to_string()
            }
            Self::Parameters(e) => e.to_string(),
            Self::Unauthorized(message) | Self::BadRequest(message) => message.clone(),
        }
    }

    /// Log the error with the action it interrupted.
    pub fn log(&self, action: &str) {
        match self {
            Self::Credentials(VaultError::NotFound)
            | Self::Parameters(_)
            | Self::BadRequest(_)
            | Self::Unauthorized(_) => {
                tracing::debug!(action, error = %self, "Command rejected");
            }
            Self::Jenkins(e) => {
                tracing::warn!(action, operation = e.operation(), error = %e, "Jenkins call failed");
            }
            _ => {
                let event_id = sentry::capture_error(self);
                tracing::error!(action, error = %self, sentry_event_id = %event_id, "Command failed");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Credentials(VaultError::Storage(_) | VaultError::Serialization(_))
                | Self::Mattermost(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Relay request error"
            );
        }

        let status = match &self {
            Self::Credentials(VaultError::NotFound) => StatusCode::FORBIDDEN,
            Self::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Jenkins(_) | Self::Mattermost(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Parameters(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Credentials(_) => CREDENTIALS_MESSAGE.to_string(),
            Self::Mattermost(_) => "Internal server error".to_string(),
            Self::Jenkins(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context from a Mattermost user ID.
pub fn set_sentry_user(user_id: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vault::CipherError;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("Invalid command token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: Invalid command token");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Credentials(VaultError::Decrypt(CipherError::Padding))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Jenkins(JenkinsError::NotFound {
                operation: "get job"
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_credential_messages_hide_details() {
        let err = AppError::Credentials(VaultError::Decrypt(CipherError::Padding));
        assert_eq!(err.user_message(), CREDENTIALS_MESSAGE);

        let err = AppError::Credentials(VaultError::NotFound);
        assert!(err.user_message().contains("/jenkins connect"));
    }
}
