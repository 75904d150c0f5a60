//! `/jenkins` slash command dispatch.
//!
//! The first word of the command text selects the action; the rest are its
//! arguments. Job arguments follow the `<job> [build]` grammar of
//! [`parse_job_reference`].

mod account;
mod builds;
mod jobs;
mod server;

use std::sync::Arc;

use jenkins_relay_core::{JobReference, parse_job_reference};
use tracing::{info, instrument};

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::jenkins::JenkinsClient;
use crate::mattermost::messages::help_text;
use crate::mattermost::{CommandResponse, SlashCommandRequest};
use crate::services::Responder;
use crate::state::AppState;

/// Actions understood by `/jenkins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Connect,
    Build,
    GetArtifacts,
    TestResults,
    GetLog,
    Abort,
    Disable,
    Enable,
    Delete,
    Me,
    Disconnect,
    SafeRestart,
    Plugins,
    CreateJob,
    Help,
}

impl CommandAction {
    /// Map the action word to an action; unknown words show the help.
    /// Matching is case-sensitive.
    #[must_use]
    pub fn parse(word: &str) -> Self {
        match word {
            "connect" => Self::Connect,
            "build" => Self::Build,
            "get-artifacts" => Self::GetArtifacts,
            "test-results" => Self::TestResults,
            "get-log" => Self::GetLog,
            "abort" => Self::Abort,
            "disable" => Self::Disable,
            "enable" => Self::Enable,
            "delete" => Self::Delete,
            "me" => Self::Me,
            "disconnect" => Self::Disconnect,
            "safe-restart" => Self::SafeRestart,
            "plugins" => Self::Plugins,
            "createjob" => Self::CreateJob,
            _ => Self::Help,
        }
    }

    /// The action word.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Build => "build",
            Self::GetArtifacts => "get-artifacts",
            Self::TestResults => "test-results",
            Self::GetLog => "get-log",
            Self::Abort => "abort",
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Delete => "delete",
            Self::Me => "me",
            Self::Disconnect => "disconnect",
            Self::SafeRestart => "safe-restart",
            Self::Plugins => "plugins",
            Self::CreateJob => "createjob",
            Self::Help => "help",
        }
    }
}

/// Everything a command handler needs.
pub(crate) struct CommandContext {
    pub state: AppState,
    pub config: Arc<RelayConfig>,
    pub request: SlashCommandRequest,
    pub responder: Responder,
}

impl CommandContext {
    /// Jenkins client for the invoking user.
    async fn client(&self) -> Result<JenkinsClient, AppError> {
        Ok(self
            .state
            .jenkins()
            .client_for(&self.config, &self.request.user_id)
            .await?)
    }

    fn reply(&self, text: impl Into<String>) -> CommandResponse {
        self.responder.ephemeral_response(text)
    }

    fn announce(&self, text: impl Into<String>) -> CommandResponse {
        self.responder.in_channel_response(text)
    }

    /// Absolute URL of a relay callback route.
    fn callback_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.public_url.trim_end_matches('/'))
    }
}

/// Run a slash command and build the response for Mattermost.
///
/// Failures become an ephemeral message for the invoking user.
#[instrument(skip_all, fields(user_id = %request.user_id, channel = %request.channel_id))]
pub async fn execute(state: &AppState, request: SlashCommandRequest) -> CommandResponse {
    let config = state.config();
    let tokens: Vec<String> = request
        .text
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let (action, args) = match tokens.split_first() {
        Some((word, rest)) => (CommandAction::parse(word), rest),
        None => (CommandAction::Help, &[][..]),
    };

    info!(action = action.name(), "Slash command received");

    let ctx = CommandContext {
        responder: state.responder(&config),
        state: state.clone(),
        config,
        request,
    };

    match dispatch(&ctx, action, args).await {
        Ok(response) => response,
        Err(e) => {
            e.log(action.name());
            ctx.reply(e.user_message())
        }
    }
}

async fn dispatch(
    ctx: &CommandContext,
    action: CommandAction,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    match action {
        CommandAction::Connect => account::connect(ctx, args).await,
        CommandAction::Me => account::me(ctx).await,
        CommandAction::Disconnect => account::disconnect(ctx).await,
        CommandAction::Build => jobs::build(ctx, args).await,
        CommandAction::Disable => jobs::disable(ctx, args).await,
        CommandAction::Enable => jobs::enable(ctx, args).await,
        CommandAction::Delete => jobs::delete(ctx, args).await,
        CommandAction::CreateJob => jobs::create(ctx, args).await,
        CommandAction::GetArtifacts => builds::artifacts(ctx, args).await,
        CommandAction::TestResults => builds::test_results(ctx, args).await,
        CommandAction::GetLog => builds::log(ctx, args).await,
        CommandAction::Abort => builds::abort(ctx, args).await,
        CommandAction::Plugins => server::plugins(ctx).await,
        CommandAction::SafeRestart => server::safe_restart(ctx).await,
        CommandAction::Help => Ok(ctx.reply(help_text())),
    }
}

/// Parse the `<job> [build]` arguments.
fn job_reference(args: &[String]) -> Result<JobReference, AppError> {
    if args.is_empty() {
        return Err(AppError::BadRequest("Please specify the job name.".to_string()));
    }
    parse_job_reference(args).ok_or_else(|| {
        AppError::BadRequest(
            "Couldn't read the job name. Wrap names containing spaces in double quotes, e.g. `\"my folder/my job\" 12`."
                .to_string(),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use jenkins_relay_core::UserId;
    use secrecy::SecretString;

    use super::*;
    use crate::mattermost::ResponseType;
    use crate::state::tests::test_state;

    /// Nothing listens on port 9; any network call fails fast.
    pub(crate) const UNREACHABLE: &str = "http://127.0.0.1:9";

    pub(crate) fn request(text: &str) -> SlashCommandRequest {
        serde_json::from_value(serde_json::json!({
            "channel_id": "channel-1",
            "team_id": "team-1",
            "user_id": "user-1",
            "user_name": "alice",
            "command": "/jenkins",
            "text": text,
            "token": "",
            "trigger_id": "trigger-1"
        }))
        .unwrap()
    }

    async fn run(text: &str) -> CommandResponse {
        let state = test_state(UNREACHABLE, UNREACHABLE);
        execute(&state, request(text)).await
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(CommandAction::parse("build"), CommandAction::Build);
        assert_eq!(CommandAction::parse("get-log"), CommandAction::GetLog);
        assert_eq!(CommandAction::parse("GET-LOG"), CommandAction::Help);
        assert_eq!(CommandAction::parse("Build"), CommandAction::Help);
        assert_eq!(CommandAction::parse("createjob"), CommandAction::CreateJob);
        assert_eq!(CommandAction::parse("launch"), CommandAction::Help);
        assert_eq!(CommandAction::SafeRestart.name(), "safe-restart");
    }

    #[test]
    fn test_job_reference_usage() {
        let err = job_reference(&[]).unwrap_err();
        assert_eq!(err.user_message(), "Please specify the job name.");

        let args = vec!["jobname".to_string(), "22".to_string(), "extra".to_string()];
        assert!(job_reference(&args).is_err());

        let args = vec!["folder/jobname".to_string(), "22".to_string()];
        let reference = job_reference(&args).unwrap();
        assert_eq!(reference.job.as_str(), "folder/jobname");
        assert_eq!(reference.build_number.as_deref(), Some("22"));
    }

    #[tokio::test]
    async fn test_empty_and_unknown_show_help() {
        for text in ["", "help", "launch rockets"] {
            let response = run(text).await;
            assert_eq!(response.response_type, ResponseType::Ephemeral);
            assert!(response.text.contains("/jenkins connect"), "{text}");
        }
    }

    #[tokio::test]
    async fn test_build_requires_job_name() {
        let response = run("build").await;
        assert_eq!(response.text, "Please specify the job name.");
    }

    #[tokio::test]
    async fn test_build_requires_connection() {
        let response = run("build deploy").await;
        assert!(response.text.contains("/jenkins connect"));
        assert_eq!(response.username.as_deref(), Some("Jenkins Plugin"));
    }

    #[tokio::test]
    async fn test_connect_usage() {
        let response = run("connect alice").await;
        assert_eq!(response.text, "Please specify both username and API token.");
    }

    #[tokio::test]
    async fn test_connect_unreachable_server_stores_nothing() {
        let state = test_state(UNREACHABLE, UNREACHABLE);
        let response = execute(&state, request("connect alice api-token")).await;
        assert!(response.text.contains("Couldn't reach the Jenkins server"));

        let stored = state
            .jenkins()
            .vault()
            .fetch(&UserId::new("user-1"))
            .await;
        assert!(stored.is_err());
    }

    #[tokio::test]
    async fn test_me_and_disconnect() {
        let state = test_state(UNREACHABLE, UNREACHABLE);

        let response = execute(&state, request("me")).await;
        assert_eq!(response.text, "You are not connected to Jenkins.");

        state
            .jenkins()
            .vault()
            .store(
                &UserId::new("user-1"),
                "alice-ci",
                &SecretString::from("api-token"),
            )
            .await
            .unwrap();

        let response = execute(&state, request("me")).await;
        assert_eq!(response.text, "You are connected to Jenkins as: alice-ci");

        let response = execute(&state, request("disconnect")).await;
        assert_eq!(response.text, "Your Jenkins account has been disconnected.");

        let response = execute(&state, request("me")).await;
        assert_eq!(response.text, "You are not connected to Jenkins.");
    }

    #[tokio::test]
    async fn test_abort_requires_build_number() {
        let response = run("abort deploy").await;
        assert_eq!(response.text, "Please specify the build number to abort.");

        let response = run("abort deploy lastBuild").await;
        assert_eq!(response.text, "Please specify the build number to abort.");
    }
}
