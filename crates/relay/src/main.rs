//! Jenkins Relay - Mattermost slash commands for Jenkins.
//!
//! This binary serves the `/jenkins` slash command and its dialog callbacks
//! on port 3002.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Jenkins REST API with per-user API tokens
//! - Mattermost REST API through a bot account
//! - `PostgreSQL` (or in-memory) key-value store for encrypted credentials
//!
//! # Signals
//!
//! - `SIGHUP` reloads the configuration from the environment / `.env`
//! - `SIGTERM` / Ctrl+C stop accepting requests, cancel build waits and
//!   drain background work

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use jenkins_relay::config::{ConfigStore, RelayConfig};
use jenkins_relay::jenkins::{JenkinsConnector, http_client};
use jenkins_relay::kv::{KvStore, MemoryKvStore, PgKvStore, create_pool};
use jenkins_relay::mattermost::MattermostClient;
use jenkins_relay::state::AppState;
use jenkins_relay::vault::CredentialVault;
use sentry::integrations::tracing as sentry_tracing;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for in-flight builds and uploads.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &RelayConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = RelayConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jenkins_relay=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p jenkins-relay-cli -- migrate
    let store: Arc<dyn KvStore> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Arc::new(PgKvStore::new(pool))
        }
        None => {
            tracing::warn!(
                "No database configured; credentials are kept in memory and lost on restart"
            );
            Arc::new(MemoryKvStore::new())
        }
    };

    let http = http_client().expect("Failed to build HTTP client");
    let vault = CredentialVault::new(store, config.jenkins.encryption_key.clone());
    let mattermost = MattermostClient::new(
        http.clone(),
        &config.mattermost.server_url,
        config.mattermost.bot_token.clone(),
    );
    let addr = config.socket_addr();
    let shutdown = CancellationToken::new();

    let state = AppState::new(
        ConfigStore::new(config),
        JenkinsConnector::new(http, vault),
        mattermost,
        shutdown.clone(),
    );

    tokio::spawn(reload_on_hangup(state.config_store().clone()));

    let app = jenkins_relay::app(state.clone())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("relay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("Server error");

    // Build waits were cancelled with the token; let them report and finish.
    let tasks = state.tasks();
    tasks.close();
    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait()).await.is_err() {
        tracing::warn!(pending = tasks.len(), "Background work still running at exit");
    }
}

/// Reload the configuration on every SIGHUP.
///
/// A configuration that fails to load, or changes settings fixed at startup,
/// is rejected and the running one kept.
#[cfg(unix)]
async fn reload_on_hangup(store: ConfigStore) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::warn!(error = %e, "Config reload on SIGHUP unavailable");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        let _ = dotenvy::dotenv_override();
        match RelayConfig::from_env().and_then(|next| store.replace(next)) {
            Ok(()) => tracing::info!("Configuration reloaded"),
            Err(e) => tracing::error!(error = %e, "Configuration reload rejected"),
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_store: ConfigStore) {}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then cancel `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    token.cancel();
}
