//! Relay configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JENKINS_URL` - Jenkins base URL, including the `http://` or `https://` scheme
//! - `JENKINS_ENCRYPTION_KEY` - Key used to encrypt stored API tokens (16, 24 or 32 bytes)
//! - `MATTERMOST_URL` - Mattermost server URL
//! - `MATTERMOST_BOT_TOKEN` - Access token of the bot account used for posts
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 127.0.0.1)
//! - `RELAY_PORT` - Listen port (default: 3002)
//! - `RELAY_PUBLIC_URL` - URL Mattermost uses to reach the relay (default: `http://<host>:<port>`)
//! - `RELAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   credentials are kept in memory when neither is set)
//! - `MATTERMOST_COMMAND_TOKEN` - Slash command token; requests are rejected when it doesn't match
//! - `JENKINS_PROFILE_IMAGE_URL` - Icon used for bot posts
//! - `JENKINS_POLL_INTERVAL_SECS` - Delay between build queue checks (default: 30)
//! - `JENKINS_POLL_MAX_ATTEMPTS` - Build queue checks before giving up (default: 20)
//! - `JENKINS_POLL_TIMEOUT_SECS` - Overall wait for a build to start (default: 900)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `RELAY_LOG_JSON` - Emit JSON logs when set

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::trigger::PollPolicy;
use crate::vault::EncryptionKey;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("{0} cannot change while the relay is running")]
    Immutable(&'static str),
}

/// Relay configuration.
///
/// Handlers never hold this directly; they take an `Arc` snapshot from the
/// [`ConfigStore`] at the start of each request.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL Mattermost uses for dialog callbacks
    pub public_url: String,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Jenkins configuration
    pub jenkins: JenkinsConfig,
    /// Mattermost configuration
    pub mattermost: MattermostConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Emit JSON formatted logs
    pub log_json: bool,
}

/// Jenkins server configuration.
#[derive(Clone)]
pub struct JenkinsConfig {
    /// Base URL of the Jenkins server
    pub base_url: Url,
    /// Key used to encrypt stored API tokens
    pub encryption_key: EncryptionKey,
    /// Icon used for bot posts
    pub profile_image_url: Option<String>,
    /// Build queue polling limits
    pub poll: PollPolicy,
}

impl std::fmt::Debug for JenkinsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsConfig")
            .field("base_url", &self.base_url.as_str())
            .field("encryption_key", &"[REDACTED]")
            .field("profile_image_url", &self.profile_image_url)
            .field("poll", &self.poll)
            .finish()
    }
}

/// Mattermost server configuration.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone)]
pub struct MattermostConfig {
    /// Mattermost server URL
    pub server_url: Url,
    /// Bot account access token
    pub bot_token: SecretString,
    /// Slash command verification token
    pub command_token: Option<SecretString>,
}

impl std::fmt::Debug for MattermostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MattermostConfig")
            .field("server_url", &self.server_url.as_str())
            .field("bot_token", &"[REDACTED]")
            .field(
                "command_token",
                &self.command_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("RELAY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RELAY_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_PORT".to_string(), e.to_string()))?;
        let public_url = get_optional_env("RELAY_PUBLIC_URL")
            .map_or_else(
                || format!("http://{}", SocketAddr::new(host, port)),
                |url| url.trim_end_matches('/').to_string(),
            );
        let database_url = get_database_url("RELAY_DATABASE_URL");

        let jenkins = JenkinsConfig::from_env()?;
        let mattermost = MattermostConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);
        let log_json = get_optional_env("RELAY_LOG_JSON").is_some();

        Ok(Self {
            host,
            port,
            public_url,
            database_url,
            jenkins,
            mattermost,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            log_json,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Check that `next` may replace `self` in a running relay.
    ///
    /// The encryption key, bind address, database and Mattermost bot
    /// connection are fixed at startup; everything else can be reloaded.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Immutable` naming the first setting that differs.
    pub fn check_reload(&self, next: &Self) -> Result<(), ConfigError> {
        if self.jenkins.encryption_key != next.jenkins.encryption_key {
            return Err(ConfigError::Immutable("JENKINS_ENCRYPTION_KEY"));
        }
        if self.socket_addr() != next.socket_addr() {
            return Err(ConfigError::Immutable("RELAY_HOST/RELAY_PORT"));
        }
        let database_url = |config: &Self| {
            config
                .database_url
                .as_ref()
                .map(|url| url.expose_secret().to_owned())
        };
        if database_url(self) != database_url(next) {
            return Err(ConfigError::Immutable("RELAY_DATABASE_URL"));
        }
        if self.mattermost.server_url != next.mattermost.server_url
            || self.mattermost.bot_token.expose_secret() != next.mattermost.bot_token.expose_secret()
        {
            return Err(ConfigError::Immutable("MATTERMOST_URL/MATTERMOST_BOT_TOKEN"));
        }
        Ok(())
    }
}

impl JenkinsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_jenkins_url(&get_required_env("JENKINS_URL")?)?;

        let key = get_required_env("JENKINS_ENCRYPTION_KEY")?;
        if let Err(e) = validate_secret_strength(&key, "JENKINS_ENCRYPTION_KEY") {
            tracing::warn!("JENKINS_ENCRYPTION_KEY validation warning: {e}");
        }
        let encryption_key = EncryptionKey::new(SecretString::from(key)).map_err(|e| {
            ConfigError::InvalidEnvVar("JENKINS_ENCRYPTION_KEY".to_string(), e.to_string())
        })?;

        let defaults = PollPolicy::default();
        let poll = PollPolicy {
            interval: get_duration_secs("JENKINS_POLL_INTERVAL_SECS", defaults.interval)?,
            max_attempts: get_parsed_or("JENKINS_POLL_MAX_ATTEMPTS", defaults.max_attempts)?,
            timeout: get_duration_secs("JENKINS_POLL_TIMEOUT_SECS", defaults.timeout)?,
        };
        if poll.max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JENKINS_POLL_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            encryption_key,
            profile_image_url: get_optional_env("JENKINS_PROFILE_IMAGE_URL"),
            poll,
        })
    }
}

impl MattermostConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("MATTERMOST_URL")?;
        let server_url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidEnvVar("MATTERMOST_URL".to_string(), e.to_string()))?;

        Ok(Self {
            server_url,
            bot_token: get_required_secret("MATTERMOST_BOT_TOKEN")?,
            command_token: get_optional_env("MATTERMOST_COMMAND_TOKEN").map(SecretString::from),
        })
    }
}

/// Parse and validate the Jenkins base URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the URL is empty, unparsable, or
/// has no `http`/`https` scheme.
pub fn parse_jenkins_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEnvVar("JENKINS_URL".to_string(), reason.to_string());

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("please add the Jenkins server URL"));
    }

    let url = Url::parse(raw).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => {
            invalid("please add a scheme to the URL (http or https)")
        }
        other => invalid(&other.to_string()),
    })?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("URL has no host")),
        _ => Err(invalid("please add a scheme to the URL (http or https)")),
    }
}

/// Holds the current configuration snapshot.
///
/// Readers clone the inner `Arc` and keep using that snapshot for the rest
/// of the request, so a reload never changes settings mid-command.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<RelayConfig>>>,
}

impl ConfigStore {
    /// Create a store holding `config`.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RelayConfig> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new configuration if it is compatible with the running one.
    ///
    /// # Errors
    ///
    /// Returns an error (and keeps the old snapshot) if `next` changes a
    /// setting that is fixed at startup.
    pub fn replace(&self, next: RelayConfig) -> Result<(), ConfigError> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.check_reload(&next)?;
        *guard = Arc::new(next);
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn get_duration_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let secs = get_parsed_or(key, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use `jr-cli keygen`."
            ),
        ));
    }

    Ok(())
}
