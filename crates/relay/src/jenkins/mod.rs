//! Jenkins integration.
//!
//! [`JenkinsClient`] speaks the Jenkins REST API with one user's
//! credentials. [`JenkinsConnector`] builds such clients from the
//! credentials stored in the vault.

mod client;
mod error;
mod types;

use jenkins_relay_core::UserId;
use reqwest::Client;
use secrecy::SecretString;

pub use client::{JenkinsClient, LAST_BUILD, http_client};
pub use error::JenkinsError;
pub use types::{Artifact, BuildRecord, BuildRef, JobInfo, PluginInfo, QueueItem};

use crate::config::RelayConfig;
use crate::vault::{CredentialVault, VaultError};

/// Creates per-user Jenkins clients.
#[derive(Debug, Clone)]
pub struct JenkinsConnector {
    http: Client,
    vault: CredentialVault,
}

impl JenkinsConnector {
    /// Create a connector sharing one HTTP client across all users.
    #[must_use]
    pub const fn new(http: Client, vault: CredentialVault) -> Self {
        Self { http, vault }
    }

    /// The credential vault backing this connector.
    #[must_use]
    pub const fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Client for explicit credentials (used to verify them before storing).
    #[must_use]
    pub fn client(
        &self,
        config: &RelayConfig,
        username: impl Into<String>,
        token: SecretString,
    ) -> JenkinsClient {
        JenkinsClient::new(self.http.clone(), &config.jenkins.base_url, username, token)
    }

    /// Client authenticated as the Jenkins account `user_id` connected.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotFound` if the user hasn't connected, or an
    /// error if the stored credentials can't be read.
    pub async fn client_for(
        &self,
        config: &RelayConfig,
        user_id: &UserId,
    ) -> Result<JenkinsClient, VaultError> {
        let credential = self.vault.fetch(user_id).await?;
        Ok(self.client(config, credential.username, credential.token))
    }
}
