//! Integration tests for Jenkins Relay.
//!
//! Each test starts `httpmock` servers standing in for Jenkins and
//! Mattermost and drives the relay router in-process.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p jenkins-relay-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `jenkins_client` - Jenkins REST calls and error mapping
//! - `trigger_engine` - Queue polling against a mock Jenkins
//! - `slash_commands` - `/jenkins` commands through the HTTP router

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use jenkins_relay::config::{ConfigStore, JenkinsConfig, MattermostConfig, RelayConfig};
use jenkins_relay::jenkins::{JenkinsClient, JenkinsConnector, http_client};
use jenkins_relay::kv::MemoryKvStore;
use jenkins_relay::mattermost::MattermostClient;
use jenkins_relay::state::AppState;
use jenkins_relay::trigger::PollPolicy;
use jenkins_relay::vault::{CredentialVault, EncryptionKey};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use url::Url;

/// Key used by every test relay.
pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Poll limits short enough for tests.
#[must_use]
pub const fn fast_poll() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts: 5,
        timeout: Duration::from_secs(5),
    }
}

/// Relay configuration pointing at the given servers.
#[must_use]
pub fn relay_config(jenkins_url: &str, mattermost_url: &str) -> RelayConfig {
    RelayConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 3002,
        public_url: "http://relay.test".to_string(),
        database_url: None,
        jenkins: JenkinsConfig {
            base_url: Url::parse(jenkins_url).unwrap(),
            encryption_key: EncryptionKey::new(SecretString::from(TEST_KEY)).unwrap(),
            profile_image_url: None,
            poll: fast_poll(),
        },
        mattermost: MattermostConfig {
            server_url: Url::parse(mattermost_url).unwrap(),
            bot_token: SecretString::from("bot-token"),
            command_token: None,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
        log_json: false,
    }
}

/// Relay state with an in-memory credential store.
#[must_use]
pub fn relay_state(config: RelayConfig) -> AppState {
    let http = http_client().unwrap();
    let vault = CredentialVault::new(
        Arc::new(MemoryKvStore::new()),
        config.jenkins.encryption_key.clone(),
    );
    let mattermost = MattermostClient::new(
        http.clone(),
        &config.mattermost.server_url,
        config.mattermost.bot_token.clone(),
    );

    AppState::new(
        ConfigStore::new(config),
        JenkinsConnector::new(http, vault),
        mattermost,
        CancellationToken::new(),
    )
}

/// Jenkins client for `base_url` as user `alice`.
#[must_use]
pub fn jenkins_client(base_url: &str) -> JenkinsClient {
    JenkinsClient::new(
        http_client().unwrap(),
        &Url::parse(base_url).unwrap(),
        "alice",
        SecretString::from("api-token"),
    )
}

/// Send `/jenkins <text>` as `user-1` in `channel-1`.
///
/// Returns the status and the parsed JSON body (if any).
pub async fn slash_command(
    app: Router,
    text: &str,
    token: &str,
) -> (StatusCode, Option<serde_json::Value>) {
    let form = format!(
        "channel_id=channel-1&team_id=team-1&user_id=user-1&user_name=alice&command=%2Fjenkins&text={}&token={}&trigger_id=trigger-1",
        urlencode(text),
        urlencode(token),
    );
    let request = Request::post("/api/command")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

/// Wait until every background task spawned by the relay has finished.
pub async fn drain(state: &AppState) {
    state.tasks().close();
    tokio::time::timeout(Duration::from_secs(10), state.tasks().wait())
        .await
        .unwrap();
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
