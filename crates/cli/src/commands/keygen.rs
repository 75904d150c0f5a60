//! Encryption key generation.
//!
//! ```bash
//! echo "JENKINS_ENCRYPTION_KEY=$(jr-cli keygen)" >> .env
//! ```

use jenkins_relay::vault::{CipherError, EncryptionKey};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::SecretString;

/// Print a random alphanumeric key of `length` bytes.
pub fn run(length: usize) -> Result<(), CipherError> {
    let key = generate(length)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{key}");
    }
    Ok(())
}

fn generate(length: usize) -> Result<String, CipherError> {
    let key: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();

    // Same check the relay applies at startup.
    EncryptionKey::new(SecretString::from(key.clone()))?;
    Ok(key)
}
