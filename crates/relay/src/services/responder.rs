//! Posts relay output back to Mattermost.
//!
//! Every post is made by the bot with the "Jenkins Plugin" display name and
//! the configured profile image. Failures are logged and never escalated:
//! the command has already done its work by the time it reports back.

use jenkins_relay_core::{ChannelId, UserId};
use tracing::{error, instrument};

use crate::mattermost::messages::{BOT_USERNAME, attachment};
use crate::mattermost::{CommandResponse, FileInfo, MattermostClient, Post, PostProps};

/// Sends ephemeral and permanent posts as the Jenkins bot.
#[derive(Debug, Clone)]
pub struct Responder {
    client: MattermostClient,
    icon_url: Option<String>,
}

impl Responder {
    #[must_use]
    pub const fn new(client: MattermostClient, icon_url: Option<String>) -> Self {
        Self { client, icon_url }
    }

    /// Slash command response carrying the bot identity.
    #[must_use]
    pub fn ephemeral_response(&self, text: impl Into<String>) -> CommandResponse {
        self.brand(CommandResponse::ephemeral(text))
    }

    /// In-channel slash command response carrying the bot identity.
    #[must_use]
    pub fn in_channel_response(&self, text: impl Into<String>) -> CommandResponse {
        self.brand(CommandResponse::in_channel(text))
    }

    /// Post a message only `user_id` sees.
    #[instrument(skip(self, message), fields(user_id = %user_id, channel = %channel_id))]
    pub async fn ephemeral(&self, user_id: &UserId, channel_id: &ChannelId, message: impl Into<String>) {
        let post = self.post(channel_id, message.into(), Vec::new());
        if let Err(e) = self.client.create_ephemeral_post(user_id, &post).await {
            error!(error = %e, "Could not send an ephemeral post");
        }
    }

    /// Post a message to the channel.
    #[instrument(skip(self, message), fields(channel = %channel_id))]
    pub async fn permanent(&self, channel_id: &ChannelId, message: impl Into<String>) {
        let post = self.post(channel_id, message.into(), Vec::new());
        if let Err(e) = self.client.create_post(&post).await {
            error!(error = %e, "Could not create a post");
        }
    }

    /// Post `text` to the channel inside the relay's attachment.
    #[instrument(skip(self, text), fields(channel = %channel_id))]
    pub async fn attachment(&self, channel_id: &ChannelId, text: impl Into<String>) {
        let mut post = self.post(channel_id, String::new(), Vec::new());
        post.props.attachments.push(attachment(text));
        if let Err(e) = self.client.create_post(&post).await {
            error!(error = %e, "Could not create a post");
        }
    }

    /// Upload a file to the channel.
    ///
    /// Returns the uploaded file's info, or `None` if the upload failed.
    #[instrument(skip(self, data), fields(channel = %channel_id, file = %file_name))]
    pub async fn upload(
        &self,
        channel_id: &ChannelId,
        file_name: &str,
        data: Vec<u8>,
    ) -> Option<FileInfo> {
        match self.client.upload_file(channel_id, file_name, data).await {
            Ok(file) => Some(file),
            Err(e) => {
                error!(error = %e, "Error uploading file");
                None
            }
        }
    }

    /// Post `message` to the channel with uploaded files attached.
    #[instrument(skip(self, message, files), fields(channel = %channel_id))]
    pub async fn share(&self, channel_id: &ChannelId, message: impl Into<String>, files: &[FileInfo]) {
        let file_ids = files.iter().map(|file| file.id.clone()).collect();
        let post = self.post(channel_id, message.into(), file_ids);
        if let Err(e) = self.client.create_post(&post).await {
            error!(error = %e, "Could not create a post");
        }
    }

    /// Link to an uploaded file.
    #[must_use]
    pub fn file_url(&self, file: &FileInfo) -> String {
        self.client.file_url(&file.id)
    }

    fn post(&self, channel_id: &ChannelId, message: String, file_ids: Vec<String>) -> Post {
        Post {
            channel_id: channel_id.clone(),
            message,
            file_ids,
            props: PostProps {
                from_webhook: Some("true".to_string()),
                override_username: Some(BOT_USERNAME.to_string()),
                override_icon_url: self.icon_url.clone(),
                attachments: Vec::new(),
            },
        }
    }

    fn brand(&self, mut response: CommandResponse) -> CommandResponse {
        response.username = Some(BOT_USERNAME.to_string());
        response.icon_url.clone_from(&self.icon_url);
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::Client;
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::mattermost::ResponseType;

    fn responder() -> Responder {
        let client = MattermostClient::new(
            Client::new(),
            &Url::parse("http://chat.test").unwrap(),
            SecretString::from("bot"),
        );
        Responder::new(client, Some("http://img.test/jenkins.png".to_string()))
    }

    #[test]
    fn test_responses_carry_bot_identity() {
        let response = responder().ephemeral_response("hi");
        assert_eq!(response.response_type, ResponseType::Ephemeral);
        assert_eq!(response.username.as_deref(), Some("Jenkins Plugin"));
        assert_eq!(response.icon_url.as_deref(), Some("http://img.test/jenkins.png"));

        let response = responder().in_channel_response("done");
        assert_eq!(response.response_type, ResponseType::InChannel);
    }

    #[test]
    fn test_posts_override_identity() {
        let post = responder().post(&ChannelId::new("c1"), "msg".to_string(), Vec::new());
        assert_eq!(post.props.from_webhook.as_deref(), Some("true"));
        assert_eq!(post.props.override_username.as_deref(), Some("Jenkins Plugin"));
    }
}
