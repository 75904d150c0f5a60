//! Build trigger and queue polling.
//!
//! Jenkins answers a build request with a queue item, not a build. The
//! engine submits the request, tells the user the build is queued, then
//! polls the queue item until Jenkins assigns an executor and reports the
//! build URL:
//!
//! ```text
//! Submitted ──▶ Queued ──▶ Started ──▶ Resolved
//!     │           │           │
//!     └───────────┴───────────┴──────▶ Failed
//! ```
//!
//! Polling is bounded by [`PollPolicy`] and can be cancelled with a
//! [`CancellationToken`].

use std::time::Duration;

use async_trait::async_trait;
use jenkins_relay_core::{BuildParameters, JobPath, QueueId};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::jenkins::{BuildRecord, JenkinsClient, JenkinsError, QueueItem};

/// Limits on waiting for a queued build to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between queue checks.
    pub interval: Duration,
    /// Queue checks before giving up.
    pub max_attempts: u32,
    /// Overall time allowed for the build to start.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 20,
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Progress of one build request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Build request sent to Jenkins.
    Submitted,
    /// Jenkins queued the build.
    Queued { queue_id: QueueId },
    /// An executor picked up the build.
    Started { queue_id: QueueId, number: u64 },
    /// Build details fetched.
    Resolved { number: u64 },
    /// The request failed; see the outcome's error.
    Failed,
}

impl TriggerState {
    const fn name(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Queued { .. } => "queued",
            Self::Started { .. } => "started",
            Self::Resolved { .. } => "resolved",
            Self::Failed => "failed",
        }
    }
}

/// Why a build request did not resolve to a running build.
#[derive(Debug, Error)]
pub enum TriggerFailure {
    /// Jenkins accepted the request without creating a queue item.
    #[error("the build was not queued; an identical build may already be waiting")]
    StillQueued,

    /// The queue item was cancelled before it started.
    #[error("queue item {0} was cancelled before the build started")]
    QueueCancelled(QueueId),

    /// The build did not start within the poll limits.
    #[error("the build did not start after {polls} queue checks")]
    Timeout { polls: u32 },

    /// Waiting was cancelled (usually because the relay is shutting down).
    #[error("waiting for the build to start was cancelled")]
    Cancelled,

    /// A Jenkins call failed.
    #[error(transparent)]
    Remote(#[from] JenkinsError),
}

impl TriggerFailure {
    /// Chat-safe description of the failure for `job`.
    #[must_use]
    pub fn user_message(&self, job: &JobPath) -> String {
        match self {
            Self::StillQueued => format!(
                "Build for the job '{job}' is already in the queue. Please try again once it has started."
            ),
            Self::QueueCancelled(_) => {
                format!("Build for the job '{job}' was cancelled while waiting in the queue.")
            }
            Self::Timeout { .. } => format!(
                "Build for the job '{job}' is still waiting in the queue. Check Jenkins for its progress."
            ),
            Self::Cancelled => {
                format!("Stopped waiting for the job '{job}' to start. Check Jenkins for its progress.")
            }
            Self::Remote(e) => e.user_message(),
        }
    }
}

/// Result of [`TriggerEngine::run`].
#[derive(Debug)]
pub struct TriggerOutcome {
    /// States passed through, starting with `Submitted`.
    pub transitions: Vec<TriggerState>,
    /// The started build, or why there is none.
    pub result: Result<BuildRecord, TriggerFailure>,
}

impl TriggerOutcome {
    /// The state the request ended in.
    #[must_use]
    pub fn final_state(&self) -> TriggerState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(TriggerState::Submitted)
    }
}

/// Jenkins calls the engine needs.
#[async_trait]
pub trait BuildApi: Send + Sync {
    /// Request a build; `None` means no queue item was created.
    async fn submit(
        &self,
        job: &JobPath,
        parameters: Option<&BuildParameters>,
    ) -> Result<Option<QueueId>, JenkinsError>;

    /// Fetch a queue item.
    async fn queue_item(&self, id: QueueId) -> Result<QueueItem, JenkinsError>;

    /// Fetch a build by number.
    async fn build(&self, job: &JobPath, number: u64) -> Result<BuildRecord, JenkinsError>;
}

#[async_trait]
impl BuildApi for JenkinsClient {
    async fn submit(
        &self,
        job: &JobPath,
        parameters: Option<&BuildParameters>,
    ) -> Result<Option<QueueId>, JenkinsError> {
        self.trigger_build(job, parameters).await
    }

    async fn queue_item(&self, id: QueueId) -> Result<QueueItem, JenkinsError> {
        Self::queue_item(self, id).await
    }

    async fn build(&self, job: &JobPath, number: u64) -> Result<BuildRecord, JenkinsError> {
        Self::build(self, job, number).await
    }
}

/// Receives the interim "build queued" notification.
#[async_trait]
pub trait TriggerNotifier: Send + Sync {
    /// Called once, right after Jenkins queues the build.
    async fn build_queued(&self, job: &JobPath, queue_id: QueueId);
}

/// Runs build requests to completion.
#[derive(Debug, Clone, Copy)]
pub struct TriggerEngine {
    policy: PollPolicy,
}

impl TriggerEngine {
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Trigger a build of `job` and wait for it to start.
    pub async fn run<A, N>(
        &self,
        api: &A,
        notifier: &N,
        job: &JobPath,
        parameters: Option<&BuildParameters>,
        cancel: &CancellationToken,
    ) -> TriggerOutcome
    where
        A: BuildApi + ?Sized,
        N: TriggerNotifier + ?Sized,
    {
        let mut transitions = vec![TriggerState::Submitted];
        let result = self
            .drive(api, notifier, job, parameters, cancel, &mut transitions)
            .await;

        match &result {
            Ok(build) => {
                advance(&mut transitions, job, TriggerState::Resolved { number: build.number });
                info!(job = %job, number = build.number, url = %build.url, "Build started");
            }
            Err(failure) => {
                advance(&mut transitions, job, TriggerState::Failed);
                warn!(job = %job, error = %failure, "Build trigger failed");
            }
        }

        TriggerOutcome {
            transitions,
            result,
        }
    }

    async fn drive<A, N>(
        &self,
        api: &A,
        notifier: &N,
        job: &JobPath,
        parameters: Option<&BuildParameters>,
        cancel: &CancellationToken,
        transitions: &mut Vec<TriggerState>,
    ) -> Result<BuildRecord, TriggerFailure>
    where
        A: BuildApi + ?Sized,
        N: TriggerNotifier + ?Sized,
    {
        let queue_id = api
            .submit(job, parameters)
            .await?
            .ok_or(TriggerFailure::StillQueued)?;

        advance(transitions, job, TriggerState::Queued { queue_id });
        notifier.build_queued(job, queue_id).await;

        let number = self.wait_for_start(api, queue_id, cancel).await?;
        advance(transitions, job, TriggerState::Started { queue_id, number });

        Ok(api.build(job, number).await?)
    }

    /// Poll the queue item until it reports a build, the limits run out,
    /// or `cancel` fires. The first check is immediate.
    async fn wait_for_start<A>(
        &self,
        api: &A,
        queue_id: QueueId,
        cancel: &CancellationToken,
    ) -> Result<u64, TriggerFailure>
    where
        A: BuildApi + ?Sized,
    {
        let deadline = Instant::now() + self.policy.timeout;
        let mut polls = 0;

        loop {
            let item = tokio::select! {
                () = cancel.cancelled() => return Err(TriggerFailure::Cancelled),
                item = tokio::time::timeout_at(deadline, api.queue_item(queue_id)) => match item {
                    Ok(item) => item?,
                    Err(_) => return Err(TriggerFailure::Timeout { polls }),
                },
            };
            polls += 1;

            if let Some(build) = item.started_build() {
                return Ok(build.number);
            }
            if item.cancelled {
                return Err(TriggerFailure::QueueCancelled(queue_id));
            }
            if polls >= self.policy.max_attempts || Instant::now() >= deadline {
                return Err(TriggerFailure::Timeout { polls });
            }

            debug!(queue_id = %queue_id, polls, why = ?item.why, "Build still queued");

            let wake = (Instant::now() + self.policy.interval).min(deadline);
            tokio::select! {
                () = cancel.cancelled() => return Err(TriggerFailure::Cancelled),
                () = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

fn advance(transitions: &mut Vec<TriggerState>, job: &JobPath, next: TriggerState) {
    if let Some(previous) = transitions.last() {
        debug!(job = %job, from = previous.name(), to = next.name(), "Trigger state change");
    }
    transitions.push(next);
}
