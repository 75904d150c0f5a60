//! Mattermost integration.
//!
//! The relay receives slash commands and dialog submissions over HTTP and
//! answers through the Mattermost REST API using a bot account.

mod client;
mod error;
pub mod messages;
mod types;

pub use client::{MattermostClient, verify_command_token};
pub use error::MattermostError;
pub use types::{
    CommandResponse, Dialog, DialogElement, DialogElementKind, DialogOption, FileInfo,
    OpenDialogRequest, Post, PostProps, ResponseType, SlackAttachment, SlashCommandRequest,
    SubmitDialogRequest, SubmitDialogResponse,
};
