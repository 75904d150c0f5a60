//! CLI subcommands.

pub mod keygen;
pub mod migrate;
pub mod parse;

use jenkins_relay::config::{ConfigError, RelayConfig};

/// Load the relay configuration and report what it resolved to.
///
/// Secrets are never printed.
pub fn check_config() -> Result<(), ConfigError> {
    let config = RelayConfig::from_env()?;

    tracing::info!(
        listen = %config.socket_addr(),
        public_url = %config.public_url,
        jenkins = %config.jenkins.base_url,
        mattermost = %config.mattermost.server_url,
        database = config.database_url.is_some(),
        command_token = config.mattermost.command_token.is_some(),
        "Configuration is valid"
    );
    Ok(())
}
