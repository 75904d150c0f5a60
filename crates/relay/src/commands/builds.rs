//! Build-level commands: `get-artifacts`, `test-results`, `get-log`, `abort`.

use jenkins_relay_core::{JobPath, JobReference};
use tracing::info;

use super::{CommandContext, job_reference};
use crate::error::AppError;
use crate::jenkins::{BuildRecord, JenkinsClient};
use crate::mattermost::CommandResponse;
use crate::services::builds::deliver_artifacts;

async fn resolve_build(
    ctx: &CommandContext,
    args: &[String],
) -> Result<(JobReference, JenkinsClient, BuildRecord), AppError> {
    let reference = job_reference(args)?;
    let client = ctx.client().await?;
    let build = client
        .build_by_selector(&reference.job, reference.build_number.as_deref())
        .await?;
    Ok((reference, client, build))
}

/// Upload the artifacts of a build (the last one by default).
pub(super) async fn artifacts(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let (reference, client, build) = resolve_build(ctx, args).await?;
    let job = reference.job;

    if build.artifacts.is_empty() {
        return Ok(ctx.reply(format!(
            "No artifacts found in build #{} of '{job}'.",
            build.number
        )));
    }

    let reply = format!(
        "{} Artifact(s) found in build #{} of '{job}'.",
        build.artifacts.len(),
        build.number
    );

    let responder = ctx.responder.clone();
    let user_id = ctx.request.user_id.clone();
    let channel_id = ctx.request.channel_id.clone();
    ctx.state.tasks().spawn(async move {
        if let Err(e) =
            deliver_artifacts(&client, &responder, &user_id, &channel_id, &job, &build).await
        {
            e.log("get-artifacts");
            responder
                .ephemeral(&user_id, &channel_id, e.user_message())
                .await;
        }
    });

    Ok(ctx.reply(reply))
}

/// Link to the test report of a build, if it has one.
pub(super) async fn test_results(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let (reference, client, build) = resolve_build(ctx, args).await?;
    let job = reference.job;

    if client.has_test_report(&job, build.number).await? {
        Ok(ctx.reply(format!(
            "Test report for build #{} of '{job}' : {}",
            build.number,
            client.test_report_url(&job, build.number)
        )))
    } else {
        Ok(ctx.reply(format!(
            "Test report for build #{} of '{job}' doesn't exist.",
            build.number
        )))
    }
}

/// Upload the console log of a build as a file.
pub(super) async fn log(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let (reference, client, build) = resolve_build(ctx, args).await?;
    let job = reference.job;
    let reply = format!("Fetching the console log of build #{} of '{job}'...", build.number);

    let responder = ctx.responder.clone();
    let user_id = ctx.request.user_id.clone();
    let channel_id = ctx.request.channel_id.clone();
    ctx.state.tasks().spawn(async move {
        let text = match client.console_text(&job, build.number).await {
            Ok(text) => text,
            Err(e) => {
                let e = AppError::from(e);
                e.log("get-log");
                responder
                    .ephemeral(&user_id, &channel_id, e.user_message())
                    .await;
                return;
            }
        };

        let file_name = format!("{}-{}.log", job.name(), build.number);
        match responder.upload(&channel_id, &file_name, text.into_bytes()).await {
            Some(file) => {
                responder
                    .share(&channel_id, log_caption(&job, &build), &[file])
                    .await;
            }
            None => {
                responder
                    .ephemeral(&user_id, &channel_id, "Couldn't upload the console log.")
                    .await;
            }
        }
    });

    Ok(ctx.reply(reply))
}

/// Caption of an uploaded console log, e.g.
/// `Console log of build #12 of 'deploy' (SUCCESS, started 2026-01-05 09:30 UTC)`.
fn log_caption(job: &JobPath, build: &BuildRecord) -> String {
    match build.started_at() {
        Some(started) => format!(
            "Console log of build #{} of '{job}' ({}, started {})",
            build.number,
            build.status(),
            started.format("%Y-%m-%d %H:%M UTC")
        ),
        None => format!(
            "Console log of build #{} of '{job}' ({})",
            build.number,
            build.status()
        ),
    }
}

/// Abort a running build. The build number is required.
pub(super) async fn abort(
    ctx: &CommandContext,
    args: &[String],
) -> Result<CommandResponse, AppError> {
    let reference = job_reference(args)?;
    let Some(number) = reference
        .build_number
        .as_deref()
        .and_then(|number| number.parse::<u64>().ok())
    else {
        return Ok(ctx.reply("Please specify the build number to abort."));
    };

    let job = reference.job;
    ctx.client().await?.abort_build(&job, number).await?;
    info!(job = %job, number, user_id = %ctx.request.user_id, "Build aborted");
    Ok(ctx.reply(format!("Build #{number} of '{job}' has been aborted.")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_caption() {
        let job = JobPath::parse("folder/deploy").unwrap();
        let build: BuildRecord = serde_json::from_value(serde_json::json!({
            "number": 12,
            "result": "SUCCESS",
            "building": false,
            "timestamp": 1_767_605_400_000_i64
        }))
        .unwrap();
        assert_eq!(
            log_caption(&job, &build),
            "Console log of build #12 of 'folder/deploy' (SUCCESS, started 2026-01-05 09:30 UTC)"
        );

        let running: BuildRecord =
            serde_json::from_value(serde_json::json!({"number": 13, "building": true})).unwrap();
        assert_eq!(
            log_caption(&job, &running),
            "Console log of build #13 of 'folder/deploy' (IN PROGRESS)"
        );
    }
}
