//! Mattermost API payloads.
//!
//! Covers slash commands, posts, file uploads and interactive dialogs.
//!
//! See: <https://developers.mattermost.com/integrate/slash-commands/> and
//! <https://developers.mattermost.com/integrate/plugins/interactive-dialogs/>

use std::collections::BTreeMap;

use jenkins_relay_core::{ChannelId, TeamId, UserId};
use serde::{Deserialize, Serialize};

/// Slash command request, sent as a form by Mattermost.
#[derive(Clone, Deserialize)]
pub struct SlashCommandRequest {
    pub channel_id: ChannelId,
    #[serde(default)]
    pub team_id: TeamId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: String,
    /// Trigger word, e.g. `/jenkins`.
    #[serde(default)]
    pub command: String,
    /// Everything after the trigger word.
    #[serde(default)]
    pub text: String,
    /// Verification token configured on the slash command.
    #[serde(default)]
    pub token: String,
    /// Allows opening an interactive dialog in response.
    #[serde(default)]
    pub trigger_id: String,
}

// `text` may carry an API token (`connect`), so neither it nor the
// verification token is printed.
impl std::fmt::Debug for SlashCommandRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashCommandRequest")
            .field("channel_id", &self.channel_id)
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("command", &self.command)
            .field("text", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Visibility of a slash command response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Only the invoking user sees it.
    Ephemeral,
    /// Posted to the channel.
    InChannel,
}

/// Slash command response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub response_type: ResponseType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl CommandResponse {
    /// A response only the invoking user sees.
    #[must_use]
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: text.into(),
            username: None,
            icon_url: None,
        }
    }

    /// A response posted to the channel.
    #[must_use]
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::InChannel,
            ..Self::ephemeral(text)
        }
    }
}

/// Legacy message attachment (rendered as a coloured side bar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackAttachment {
    pub text: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Post properties used by bot posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
}

/// A post to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub channel_id: ChannelId,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_ids: Vec<String>,
    pub props: PostProps,
}

impl Post {
    /// A plain text post.
    #[must_use]
    pub fn new(channel_id: ChannelId, message: impl Into<String>) -> Self {
        Self {
            channel_id,
            message: message.into(),
            file_ids: Vec::new(),
            props: PostProps::default(),
        }
    }
}

/// `POST /api/v4/posts/ephemeral` body.
#[derive(Debug, Serialize)]
pub(crate) struct EphemeralPostRequest<'a> {
    pub user_id: &'a UserId,
    pub post: &'a Post,
}

/// Subset of a created post.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPost {
    pub id: String,
}

/// Uploaded file metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// `POST /api/v4/files` response.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub file_infos: Vec<FileInfo>,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Kind of interactive dialog element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogElementKind {
    Text,
    Textarea,
    Bool,
    Select,
}

/// Option of a `select` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogOption {
    pub text: String,
    pub value: String,
}

/// One input of an interactive dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogElement {
    pub display_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DialogElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<DialogOption>,
}

impl DialogElement {
    /// A text input with the given name and label.
    #[must_use]
    pub fn text(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            name: name.into(),
            kind: DialogElementKind::Text,
            subtype: None,
            default: None,
            placeholder: None,
            help_text: None,
            optional: false,
            max_length: None,
            options: Vec::new(),
        }
    }
}

/// Interactive dialog definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub callback_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub introduction_text: String,
    pub elements: Vec<DialogElement>,
    pub submit_label: String,
    #[serde(default)]
    pub notify_on_cancel: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,
}

/// `POST /api/v4/actions/dialogs/open` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDialogRequest {
    pub trigger_id: String,
    /// Callback URL the submission is posted to.
    pub url: String,
    pub dialog: Dialog,
}

/// Dialog submission posted to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitDialogRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub channel_id: ChannelId,
    #[serde(default)]
    pub team_id: TeamId,
    #[serde(default)]
    pub submission: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub cancelled: bool,
}

impl SubmitDialogRequest {
    /// Submitted values as strings; empty fields are left out.
    #[must_use]
    pub fn values(&self) -> BTreeMap<String, String> {
        self.submission
            .iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((name.clone(), value))
            })
            .collect()
    }

    /// A single submitted string value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.submission
            .get(name)
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Response to a dialog submission; field errors are shown in the dialog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitDialogResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl SubmitDialogResponse {
    /// Accept the submission and close the dialog.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// Keep the dialog open with an error next to `field`.
    #[must_use]
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: None,
            errors: BTreeMap::from([(field.into(), message.into())]),
        }
    }

    /// Keep the dialog open with a general error.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            errors: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_command_response_json() {
        let json = serde_json::to_value(CommandResponse::in_channel("done")).unwrap();
        assert_eq!(json["response_type"], "in_channel");
        assert_eq!(json["text"], "done");
        assert!(json.get("username").is_none());

        let json = serde_json::to_value(CommandResponse::ephemeral("hi")).unwrap();
        assert_eq!(json["response_type"], "ephemeral");
    }

    #[test]
    fn test_submission_values() {
        let request: SubmitDialogRequest = serde_json::from_str(
            r#"{
                "type": "dialog_submission",
                "callback_id": "build",
                "user_id": "u1",
                "channel_id": "c1",
                "submission": {"BRANCH": "main", "DRY_RUN": true, "COUNT": 3, "EMPTY": null}
            }"#,
        )
        .unwrap();

        let values = request.values();
        assert_eq!(values.get("BRANCH").map(String::as_str), Some("main"));
        assert_eq!(values.get("DRY_RUN").map(String::as_str), Some("true"));
        assert_eq!(values.get("COUNT").map(String::as_str), Some("3"));
        assert!(!values.contains_key("EMPTY"));
        assert_eq!(request.value("BRANCH"), Some("main"));
        assert_eq!(request.value("DRY_RUN"), None);
    }

    #[test]
    fn test_dialog_element_json() {
        let mut element = DialogElement::text("token", "API Token");
        element.subtype = Some("password".to_string());
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["subtype"], "password");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_post_props_skip_empty() {
        let post = Post::new(ChannelId::new("c1"), "hello");
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["props"], serde_json::json!({}));
        assert!(json.get("file_ids").is_none());
    }

    #[test]
    fn test_slash_command_debug_redacts_text() {
        let request: SlashCommandRequest = serde_json::from_value(serde_json::json!({
            "channel_id": "c1",
            "user_id": "u1",
            "command": "/jenkins",
            "text": "connect alice s3cr3t-api-token",
            "token": "verification-token"
        }))
        .unwrap();
        let debug_output = format!("{request:?}");
        assert!(!debug_output.contains("s3cr3t-api-token"));
        assert!(!debug_output.contains("verification-token"));
    }
}
