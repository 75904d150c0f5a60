//! Server-wide commands: `plugins` and `safe-restart`.

use std::fmt::Write as _;

use tracing::info;

use super::CommandContext;
use crate::error::AppError;
use crate::jenkins::PluginInfo;
use crate::mattermost::CommandResponse;

/// Post the installed plugins to the channel.
pub(super) async fn plugins(ctx: &CommandContext) -> Result<CommandResponse, AppError> {
    let mut plugins = ctx.client().await?.plugins().await?;
    if plugins.is_empty() {
        return Ok(ctx.reply("No plugins are installed on the Jenkins server."));
    }

    plugins.sort_by(|a, b| a.short_name.cmp(&b.short_name));
    ctx.responder
        .attachment(&ctx.request.channel_id, plugin_table(&plugins))
        .await;

    Ok(ctx.reply(format!("{} plugin(s) installed.", plugins.len())))
}

pub(super) async fn safe_restart(ctx: &CommandContext) -> Result<CommandResponse, AppError> {
    ctx.client().await?.safe_restart().await?;
    info!(user_id = %ctx.request.user_id, "Jenkins safe restart requested");
    Ok(ctx.announce(
        "Jenkins will restart once all running builds have finished.",
    ))
}

fn plugin_table(plugins: &[PluginInfo]) -> String {
    let mut table = String::from("| Plugin | Version | Status |\n|:--|:--|:--|\n");
    for plugin in plugins {
        let name = if plugin.long_name.is_empty() {
            &plugin.short_name
        } else {
            &plugin.long_name
        };
        let status = match (plugin.active, plugin.enabled) {
            (true, _) => "active",
            (false, true) => "inactive",
            (false, false) => "disabled",
        };
        let update = if plugin.has_update { " (update available)" } else { "" };
        let _ = writeln!(table, "| {name} | {} | {status}{update} |", plugin.version);
    }
    table
}
