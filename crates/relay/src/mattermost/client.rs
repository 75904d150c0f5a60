//! Mattermost REST API client.
//!
//! Authenticates as the bot account and provides the calls the relay needs:
//! posts, ephemeral posts, file uploads and interactive dialogs.

use jenkins_relay_core::{ChannelId, UserId};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::error::MattermostError;
use super::types::{
    ApiErrorBody, CreatedPost, EphemeralPostRequest, FileInfo, OpenDialogRequest, Post,
    UploadResponse,
};

/// Mattermost API client for the relay's bot account.
#[derive(Clone)]
pub struct MattermostClient {
    /// HTTP client.
    client: Client,
    /// Server URL without a trailing slash.
    base_url: String,
    /// Bot access token.
    bot_token: SecretString,
}

impl std::fmt::Debug for MattermostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MattermostClient")
            .field("base_url", &self.base_url)
            .field("bot_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl MattermostClient {
    /// Create a new Mattermost client.
    #[must_use]
    pub fn new(client: Client, server_url: &Url, bot_token: SecretString) -> Self {
        Self {
            client,
            base_url: server_url.as_str().trim_end_matches('/').to_string(),
            bot_token,
        }
    }

    /// Link to an uploaded file.
    #[must_use]
    pub fn file_url(&self, file_id: &str) -> String {
        format!("{}/api/v4/files/{file_id}", self.base_url)
    }

    /// Create a post. Returns the new post ID.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Mattermost returns an error.
    #[instrument(skip(self, post), fields(channel = %post.channel_id))]
    pub async fn create_post(&self, post: &Post) -> Result<String, MattermostError> {
        let created: CreatedPost = Self::send_json(self.request("/api/v4/posts").json(post)).await?;
        debug!(post_id = %created.id, "Post created");
        Ok(created.id)
    }

    /// Create a post only `user_id` can see.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Mattermost returns an error.
    #[instrument(skip(self, post), fields(channel = %post.channel_id, user_id = %user_id))]
    pub async fn create_ephemeral_post(
        &self,
        user_id: &UserId,
        post: &Post,
    ) -> Result<(), MattermostError> {
        let body = EphemeralPostRequest { user_id, post };
        Self::send(self.request("/api/v4/posts/ephemeral").json(&body)).await?;
        Ok(())
    }

    /// Upload a file to a channel so it can be attached to a post.
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails.
    #[instrument(skip(self, data), fields(channel = %channel_id, size = data.len()))]
    pub async fn upload_file(
        &self,
        channel_id: &ChannelId,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<FileInfo, MattermostError> {
        let form = Form::new()
            .text("channel_id", channel_id.to_string())
            .part("files", Part::bytes(data).file_name(file_name.to_string()));

        let uploaded: UploadResponse =
            Self::send_json(self.request("/api/v4/files").multipart(form)).await?;

        uploaded
            .file_infos
            .into_iter()
            .next()
            .ok_or_else(|| MattermostError::Response("upload returned no file".to_string()))
    }

    /// Open an interactive dialog.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails (for example an expired
    /// trigger ID).
    #[instrument(skip(self, request), fields(callback_id = %request.dialog.callback_id))]
    pub async fn open_dialog(&self, request: &OpenDialogRequest) -> Result<(), MattermostError> {
        Self::send(self.request("/api/v4/actions/dialogs/open").json(request)).await?;
        Ok(())
    }

    fn request(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, MattermostError> {
        Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| MattermostError::Response(e.to_string()))
    }

    async fn send(request: RequestBuilder) -> Result<Response, MattermostError> {
        let response = request
            .send()
            .await
            .map_err(|e| MattermostError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        error!(status = status.as_u16(), error = %message, "Mattermost API error");

        Err(MattermostError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Check a slash command verification token.
#[must_use]
pub fn verify_command_token(expected: &SecretString, received: &str) -> bool {
    constant_time_compare(expected.expose_secret(), received)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hello!"));
    }

    #[test]
    fn test_verify_command_token() {
        let expected = SecretString::from("tok3n");
        assert!(verify_command_token(&expected, "tok3n"));
        assert!(!verify_command_token(&expected, ""));
        assert!(!verify_command_token(&expected, "tok3m"));
    }

    #[test]
    fn test_file_url() {
        let client = MattermostClient::new(
            Client::new(),
            &Url::parse("https://chat.example.org/").unwrap(),
            SecretString::from("bot"),
        );
        assert_eq!(
            client.file_url("abc123"),
            "https://chat.example.org/api/v4/files/abc123"
        );
        assert!(!format!("{client:?}").contains("\"bot\""));
    }
}
