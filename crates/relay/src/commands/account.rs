//! `connect`, `me` and `disconnect`.

use secrecy::SecretString;
use tracing::info;

use super::CommandContext;
use crate::error::AppError;
use crate::jenkins::JenkinsError;
use crate::mattermost::CommandResponse;
use crate::vault::VaultError;

/// Verify the credentials against Jenkins, then store them.
pub(super) async fn connect(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let [username, token] = args else {
        return Ok(ctx.reply("Please specify both username and API token."));
    };
    let token = SecretString::from(token.clone());

    let client = ctx
        .state
        .jenkins()
        .client(&ctx.config, username.clone(), token.clone());
    match client.verify().await {
        Ok(()) => {}
        Err(JenkinsError::Unauthorized { .. }) => {
            return Ok(ctx.reply("Incorrect username or token"));
        }
        Err(e) => return Err(e.into()),
    }

    ctx.state
        .jenkins()
        .vault()
        .store(&ctx.request.user_id, username, &token)
        .await?;

    info!(user_id = %ctx.request.user_id, jenkins_user = %username, "Jenkins account connected");
    Ok(ctx.reply("Jenkins has been connected."))
}

pub(super) async fn me(ctx: &CommandContext) -> Result<CommandResponse, AppError> {
    match ctx.state.jenkins().vault().fetch(&ctx.request.user_id).await {
        Ok(credential) => Ok(ctx.reply(format!(
            "You are connected to Jenkins as: {}",
            credential.username
        ))),
        Err(VaultError::NotFound) => Ok(ctx.reply("You are not connected to Jenkins.")),
        Err(e) => Err(e.into()),
    }
}

/// Remove the stored credentials. A record that no longer decrypts is
/// removed too.
pub(super) async fn disconnect(ctx: &CommandContext) -> Result<CommandResponse, AppError> {
    let vault = ctx.state.jenkins().vault();
    if let Err(VaultError::NotFound) = vault.fetch(&ctx.request.user_id).await {
        return Ok(ctx.reply("You are not connected to Jenkins."));
    }

    vault.delete(&ctx.request.user_id).await?;
    info!(user_id = %ctx.request.user_id, "Jenkins account disconnected");
    Ok(ctx.reply("Your Jenkins account has been disconnected."))
}
