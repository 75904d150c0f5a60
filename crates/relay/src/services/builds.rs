//! Build triggering and artifact delivery shared by commands and dialogs.

use std::sync::Arc;

use async_trait::async_trait;
use jenkins_relay_core::{BuildParameters, ChannelId, JobPath, QueueId, UserId};
use tracing::{info, instrument, warn};

use crate::config::RelayConfig;
use crate::jenkins::{BuildRecord, JenkinsClient};
use crate::state::AppState;
use crate::trigger::{TriggerEngine, TriggerNotifier, TriggerOutcome};

use super::Responder;

/// Tells the requesting user their build is queued.
#[derive(Debug)]
pub struct QueuedNotifier<'a> {
    responder: &'a Responder,
    user_id: &'a UserId,
    channel_id: &'a ChannelId,
}

impl<'a> QueuedNotifier<'a> {
    #[must_use]
    pub const fn new(responder: &'a Responder, user_id: &'a UserId, channel_id: &'a ChannelId) -> Self {
        Self {
            responder,
            user_id,
            channel_id,
        }
    }
}

#[async_trait]
impl TriggerNotifier for QueuedNotifier<'_> {
    async fn build_queued(&self, job: &JobPath, _queue_id: QueueId) {
        self.responder
            .ephemeral(self.user_id, self.channel_id, queued_message(job))
            .await;
    }
}

/// Text of the interim "queued" notification.
#[must_use]
pub fn queued_message(job: &JobPath) -> String {
    format!("Build for the job '{job}' has been triggered and is in queue.")
}

/// Text reporting a started build.
#[must_use]
pub fn started_message(job: &JobPath, build: &BuildRecord) -> String {
    format!(
        "Build for the job '{job}' has been started.\nHere's the build URL : {}",
        build.url
    )
}

/// Trigger a build of `job` as `client`'s user and wait for it to start.
///
/// The wait stops early when the relay shuts down.
#[instrument(skip_all, fields(job = %job, user_id = %user_id))]
pub async fn trigger_and_wait(
    state: &AppState,
    config: &RelayConfig,
    client: &JenkinsClient,
    user_id: &UserId,
    channel_id: &ChannelId,
    job: &JobPath,
    parameters: Option<&BuildParameters>,
) -> TriggerOutcome {
    let responder = state.responder(config);
    let notifier = QueuedNotifier::new(&responder, user_id, channel_id);
    let cancel = state.shutdown().child_token();

    TriggerEngine::new(config.jenkins.poll)
        .run(client, &notifier, job, parameters, &cancel)
        .await
}

/// Run [`trigger_and_wait`] on the state's task tracker and report the
/// outcome: a started build is announced in the channel, a failure is told
/// to the requesting user.
pub fn spawn_build(
    state: &AppState,
    config: Arc<RelayConfig>,
    client: JenkinsClient,
    user_id: UserId,
    channel_id: ChannelId,
    job: JobPath,
    parameters: Option<BuildParameters>,
) {
    let tracker = state.tasks().clone();
    let state = state.clone();
    tracker.spawn(async move {
        let outcome = trigger_and_wait(
            &state,
            &config,
            &client,
            &user_id,
            &channel_id,
            &job,
            parameters.as_ref(),
        )
        .await;

        let responder = state.responder(&config);
        match outcome.result {
            Ok(build) => {
                responder
                    .permanent(&channel_id, started_message(&job, &build))
                    .await;
            }
            Err(failure) => {
                responder
                    .ephemeral(&user_id, &channel_id, failure.user_message(&job))
                    .await;
            }
        }
    });
}

/// Download every artifact of `build` and upload it to the channel.
///
/// Returns the number of artifacts delivered.
///
/// # Errors
///
/// Returns an error if an artifact can't be downloaded from Jenkins.
#[instrument(skip_all, fields(job = %job, number = build.number))]
pub async fn deliver_artifacts(
    client: &JenkinsClient,
    responder: &Responder,
    user_id: &UserId,
    channel_id: &ChannelId,
    job: &JobPath,
    build: &BuildRecord,
) -> Result<usize, crate::error::AppError> {
    if build.artifacts.is_empty() {
        return Ok(0);
    }

    let mut delivered = 0;
    for artifact in &build.artifacts {
        let data = client.download_artifact(job, build.number, artifact).await?;

        responder
            .ephemeral(
                user_id,
                channel_id,
                format!("Uploading artifact '{}' ...", artifact.file_name),
            )
            .await;

        match responder.upload(channel_id, &artifact.file_name, data).await {
            Some(file) => {
                let link = responder.file_url(&file);
                responder
                    .permanent(channel_id, format!("Artifact - {} : {link}", file.name))
                    .await;
                delivered += 1;
            }
            None => warn!(artifact = %artifact.file_name, "Artifact upload failed"),
        }
    }

    info!(delivered, total = build.artifacts.len(), "Artifacts delivered");
    Ok(delivered)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let job = JobPath::parse("team/deploy").unwrap();
        assert_eq!(
            queued_message(&job),
            "Build for the job 'team/deploy' has been triggered and is in queue."
        );

        let build: BuildRecord = serde_json::from_str(
            r#"{"number": 4, "url": "http://jenkins.test/job/team/job/deploy/4/"}"#,
        )
        .unwrap();
        assert_eq!(
            started_message(&job, &build),
            "Build for the job 'team/deploy' has been started.\nHere's the build URL : http://jenkins.test/job/team/job/deploy/4/"
        );
    }
}
