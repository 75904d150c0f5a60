//! Authentication extractors for Mattermost callbacks.

use axum::{extract::FromRequestParts, http::request::Parts};
use jenkins_relay_core::UserId;

use crate::error::AppError;

/// Header Mattermost sets on requests made on behalf of a user.
pub const USER_ID_HEADER: &str = "Mattermost-User-ID";

/// Extractor that requires the `Mattermost-User-ID` header.
///
/// Requests without it are rejected with 401 Unauthorized.
///
/// # Example
///
/// ```rust,ignore
/// async fn callback(MattermostUser(user_id): MattermostUser) -> impl IntoResponse {
///     format!("Hello, {user_id}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MattermostUser(pub UserId);

impl<S> FromRequestParts<S> for MattermostUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized".to_string()))?;

        crate::error::set_sentry_user(user_id);
        Ok(Self(UserId::new(user_id)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    use super::*;

    async fn extract(request: Request<()>) -> Result<MattermostUser, AppError> {
        let (mut parts, ()) = request.into_parts();
        MattermostUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_user_header_present() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "user-1")
            .body(())
            .unwrap();
        let MattermostUser(user_id) = extract(request).await.unwrap();
        assert_eq!(user_id.as_str(), "user-1");
    }

    #[tokio::test]
    async fn test_user_header_missing_or_blank() {
        let request = Request::builder().body(()).unwrap();
        let err = extract(request).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .header(USER_ID_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(extract(request).await.is_err());
    }
}
