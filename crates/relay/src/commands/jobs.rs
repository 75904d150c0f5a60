//! Job-level commands: `build`, `enable`, `disable`, `delete`, `createjob`.

use jenkins_relay_core::JobPath;
use tracing::info;

use super::{CommandContext, job_reference};
use crate::error::AppError;
use crate::mattermost::CommandResponse;
use crate::mattermost::messages::{build_parameters_dialog, create_job_dialog};
use crate::services::builds::spawn_build;

/// Trigger a build, or open the parameters dialog for parameterized jobs.
pub(super) async fn build(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    // A trailing build number is accepted by the grammar and ignored.
    let job = job_reference(args)?.job;
    let client = ctx.client().await?;
    let info = client.job(&job).await?;

    if info.is_disabled() {
        return Ok(ctx.reply(format!("The job '{job}' is disabled.")));
    }

    if info.is_parameterized() {
        let trigger_id = require_trigger_id(ctx)?;
        let callback = ctx.callback_url(&format!(
            "/api/triggerBuild/{}",
            urlencoding::encode(job.as_str())
        ));
        let dialog =
            build_parameters_dialog(trigger_id, callback, &job, &info.parameter_definitions());
        ctx.state.mattermost().open_dialog(&dialog).await?;
        return Ok(ctx.reply(format!("Fill in the build parameters for '{job}'.")));
    }

    let reply = format!("Triggering a build of '{job}'...");
    spawn_build(
        &ctx.state,
        ctx.config.clone(),
        client,
        ctx.request.user_id.clone(),
        ctx.request.channel_id.clone(),
        job,
        None,
    );
    Ok(ctx.reply(reply))
}

pub(super) async fn enable(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let job = job_reference(args)?.job;
    ctx.client().await?.enable_job(&job).await?;
    info!(job = %job, user_id = %ctx.request.user_id, "Job enabled");
    Ok(ctx.announce(format!("Job '{job}' has been enabled.")))
}

pub(super) async fn disable(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let job = job_reference(args)?.job;
    ctx.client().await?.disable_job(&job).await?;
    info!(job = %job, user_id = %ctx.request.user_id, "Job disabled");
    Ok(ctx.announce(format!("Job '{job}' has been disabled.")))
}

pub(super) async fn delete(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let job = job_reference(args)?.job;
    ctx.client().await?.delete_job(&job).await?;
    info!(job = %job, user_id = %ctx.request.user_id, "Job deleted");
    Ok(ctx.announce(format!("Job '{job}' has been deleted.")))
}

/// Open the dialog collecting the new job's `config.xml`.
pub(super) async fn create(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let job: Option<JobPath> = if args.is_empty() {
        None
    } else {
        Some(job_reference(args)?.job)
    };

    // Fail now rather than after the user has filled in the dialog.
    ctx.client().await?;

    let trigger_id = require_trigger_id(ctx)?;
    let callback = match &job {
        Some(job) => ctx.callback_url(&format!(
            "/api/createJob/{}",
            urlencoding::encode(job.as_str())
        )),
        None => ctx.callback_url("/api/createJob"),
    };
    let dialog = create_job_dialog(trigger_id, callback, job.as_ref());
    ctx.state.mattermost().open_dialog(&dialog).await?;

    Ok(ctx.reply("Fill in the configuration of the new job."))
}

fn require_trigger_id(ctx: &CommandContext) -> Result<&str, AppError> {
    let trigger_id = ctx.request.trigger_id.as_str();
    if trigger_id.is_empty() {
        return Err(AppError::BadRequest(
            "Mattermost didn't allow opening a dialog for this command. Please try again."
                .to_string(),
        ));
    }
    Ok(trigger_id)
}
