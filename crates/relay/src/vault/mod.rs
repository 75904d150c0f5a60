//! Per-user Jenkins credentials.
//!
//! Each connected Mattermost user has one record in the key-value store
//! under `<user id>_jenkinsToken`:
//!
//! ```json
//! {"UserID": "...", "Username": "alice", "Token": "<base64url ciphertext>"}
//! ```
//!
//! Only the API token is encrypted; see [`cipher`] for the format.

pub mod cipher;

use std::sync::Arc;

use jenkins_relay_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::kv::{KvError, KvStore};

pub use cipher::{CipherError, EncryptionKey};

const TOKEN_KEY_SUFFIX: &str = "_jenkinsToken";

/// Errors from the credential vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The user has never connected (or has disconnected).
    #[error("no Jenkins credentials stored for this user")]
    NotFound,

    /// The stored token could not be decrypted.
    #[error("failed to decrypt stored token: {0}")]
    Decrypt(#[from] CipherError),

    /// The stored record is not valid JSON.
    #[error("stored credential record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key-value store failed.
    #[error("credential storage failed: {0}")]
    Storage(#[from] KvError),
}

/// Jenkins credentials of a Mattermost user.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct UserCredential {
    pub user_id: UserId,
    pub username: String,
    pub token: SecretString,
}

impl std::fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredential")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Persisted record layout.
#[derive(Serialize, Deserialize)]
struct StoredCredential {
    #[serde(rename = "UserID")]
    user_id: String,
    #[serde(rename = "Username")]
    username: String,
    #[serde(rename = "Token")]
    token: String,
}

/// Encrypts, stores and retrieves user credentials.
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn KvStore>,
    key: EncryptionKey,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// Create a vault over `store` using `key` for token encryption.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, key: EncryptionKey) -> Self {
        Self { store, key }
    }

    /// Store (or replace) the credentials of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or the store write fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn store(
        &self,
        user_id: &UserId,
        username: &str,
        token: &SecretString,
    ) -> Result<(), VaultError> {
        let record = StoredCredential {
            user_id: user_id.as_str().to_string(),
            username: username.to_string(),
            token: cipher::encrypt(&self.key, token.expose_secret())?,
        };
        let value = serde_json::to_vec(&record)?;

        self.store.set(&storage_key(user_id), &value).await?;
        tracing::info!(username, "Stored Jenkins credentials");
        Ok(())
    }

    /// Fetch and decrypt the credentials of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotFound` if the user has not connected, or an
    /// error if the record cannot be read or decrypted.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch(&self, user_id: &UserId) -> Result<UserCredential, VaultError> {
        let value = self
            .store
            .get(&storage_key(user_id))
            .await?
            .ok_or(VaultError::NotFound)?;

        let record: StoredCredential = serde_json::from_slice(&value)?;
        let token = cipher::decrypt(&self.key, &record.token)?;

        Ok(UserCredential {
            user_id: user_id.clone(),
            username: record.username,
            token: SecretString::from(token),
        })
    }

    /// Remove the credentials of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: &UserId) -> Result<(), VaultError> {
        self.store.delete(&storage_key(user_id)).await?;
        tracing::info!("Removed Jenkins credentials");
        Ok(())
    }
}

fn storage_key(user_id: &UserId) -> String {
    format!("{user_id}{TOKEN_KEY_SUFFIX}")
}
