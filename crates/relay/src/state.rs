//! Application state shared across handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{ConfigStore, RelayConfig};
use crate::jenkins::JenkinsConnector;
use crate::mattermost::MattermostClient;
use crate::services::Responder;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration snapshot, the Jenkins connector and the Mattermost client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ConfigStore,
    jenkins: JenkinsConnector,
    mattermost: MattermostClient,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ConfigStore,
        jenkins: JenkinsConnector,
        mattermost: MattermostClient,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                jenkins,
                mattermost,
                shutdown,
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Snapshot of the current configuration.
    ///
    /// Handlers take one snapshot per request so a reload never changes
    /// settings halfway through.
    #[must_use]
    pub fn config(&self) -> Arc<RelayConfig> {
        self.inner.config.snapshot()
    }

    /// The reloadable configuration store.
    #[must_use]
    pub fn config_store(&self) -> &ConfigStore {
        &self.inner.config
    }

    /// Get a reference to the Jenkins connector.
    #[must_use]
    pub fn jenkins(&self) -> &JenkinsConnector {
        &self.inner.jenkins
    }

    /// Get a reference to the Mattermost client.
    #[must_use]
    pub fn mattermost(&self) -> &MattermostClient {
        &self.inner.mattermost
    }

    /// Responder posting as the Jenkins bot with `config`'s profile image.
    #[must_use]
    pub fn responder(&self, config: &RelayConfig) -> Responder {
        Responder::new(
            self.inner.mattermost.clone(),
            config.jenkins.profile_image_url.clone(),
        )
    }

    /// Token cancelled when the relay shuts down.
    #[must_use]
    pub fn shutdown(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Tracker for work that outlives the request that started it.
    ///
    /// Slash commands and dialog callbacks must answer Mattermost quickly, so
    /// build waits and uploads run here; shutdown waits for them to finish.
    #[must_use]
    pub fn tasks(&self) -> &TaskTracker {
        &self.inner.tasks
    }
}
