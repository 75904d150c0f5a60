//! Token encryption.
//!
//! AES in CFB mode with a random IV prepended to the ciphertext. The
//! plaintext is PKCS#7 padded to the block size first, so a wrong key is
//! detected by the padding check instead of yielding garbage. The result is
//! base64 encoded with the URL-safe alphabet and `=` padding.
//!
//! ```text
//! base64url( IV[16] || CFB(key, IV, pkcs7(plaintext)) )
//! ```

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// AES block size, also the IV length.
pub const BLOCK_SIZE: usize = 16;

type Aes128CfbEnc = cfb_mode::Encryptor<aes::Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<aes::Aes128>;
type Aes192CfbEnc = cfb_mode::Encryptor<aes::Aes192>;
type Aes192CfbDec = cfb_mode::Decryptor<aes::Aes192>;
type Aes256CfbEnc = cfb_mode::Encryptor<aes::Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<aes::Aes256>;

/// Errors from encrypting or decrypting a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption key must be 16, 24 or 32 bytes (got {0})")]
    InvalidKeyLength(usize),
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("ciphertext length {0} is not a whole number of blocks after the IV")]
    InvalidLength(usize),
    #[error("invalid padding")]
    Padding,
    #[error("decrypted token is not valid UTF-8")]
    Utf8,
}

/// Process-wide AES key.
///
/// Wraps the configured secret; the byte length selects AES-128, AES-192 or
/// AES-256.
#[derive(Clone)]
pub struct EncryptionKey(SecretString);

impl EncryptionKey {
    /// Validate and wrap a key.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidKeyLength` unless the key is 16, 24 or
    /// 32 bytes long.
    pub fn new(key: SecretString) -> Result<Self, CipherError> {
        match key.expose_secret().len() {
            16 | 24 | 32 => Ok(Self(key)),
            n => Err(CipherError::InvalidKeyLength(n)),
        }
    }

    fn bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Eq for EncryptionKey {}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"[REDACTED]").finish()
    }
}

/// Encrypt `plaintext` under a fresh random IV.
///
/// # Errors
///
/// Returns an error only if the key is unusable.
pub fn encrypt(key: &EncryptionKey, plaintext: &str) -> Result<String, CipherError> {
    let iv: [u8; BLOCK_SIZE] = rand::random();
    encrypt_with_iv(key, &iv, plaintext)
}

/// Encrypt with a caller-chosen IV.
pub(crate) fn encrypt_with_iv(
    key: &EncryptionKey,
    iv: &[u8; BLOCK_SIZE],
    plaintext: &str,
) -> Result<String, CipherError> {
    let mut message = pad(plaintext.as_bytes());
    cfb_encrypt(key.bytes(), iv, &mut message)?;

    let mut out = Vec::with_capacity(BLOCK_SIZE + message.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&message);
    Ok(URL_SAFE.encode(out))
}

/// Decrypt a value produced by [`encrypt`].
///
/// # Errors
///
/// Returns an error if the input is not base64, has the wrong length, or
/// fails the padding check (which is what a wrong key usually produces).
pub fn decrypt(key: &EncryptionKey, encoded: &str) -> Result<String, CipherError> {
    let data = URL_SAFE.decode(encoded.trim())?;
    if data.len() < 2 * BLOCK_SIZE || data.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::InvalidLength(data.len()));
    }

    let (iv, message) = data.split_at(BLOCK_SIZE);
    let mut message = message.to_vec();
    cfb_decrypt(key.bytes(), iv, &mut message)?;

    let plaintext = unpad(&message)?;
    String::from_utf8(plaintext.to_vec()).map_err(|_| CipherError::Utf8)
}

/// Append PKCS#7 padding up to the next block boundary.
fn pad(src: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - src.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(src.len() + padding);
    out.extend_from_slice(src);
    #[allow(clippy::cast_possible_truncation)] // padding is in 1..=16
    out.resize(src.len() + padding, padding as u8);
    out
}

/// Strip and verify PKCS#7 padding.
fn unpad(src: &[u8]) -> Result<&[u8], CipherError> {
    let &last = src.last().ok_or(CipherError::Padding)?;
    let padding = usize::from(last);
    if padding == 0 || padding > BLOCK_SIZE || padding > src.len() {
        return Err(CipherError::Padding);
    }

    let (body, tail) = src.split_at(src.len() - padding);
    if tail.iter().any(|&b| b != last) {
        return Err(CipherError::Padding);
    }
    Ok(body)
}

fn cfb_encrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CipherError> {
    let invalid = |_| CipherError::InvalidKeyLength(key.len());
    match key.len() {
        16 => Aes128CfbEnc::new_from_slices(key, iv).map_err(invalid)?.encrypt(buf),
        24 => Aes192CfbEnc::new_from_slices(key, iv).map_err(invalid)?.encrypt(buf),
        32 => Aes256CfbEnc::new_from_slices(key, iv).map_err(invalid)?.encrypt(buf),
        n => return Err(CipherError::InvalidKeyLength(n)),
    }
    Ok(())
}

fn cfb_decrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CipherError> {
    let invalid = |_| CipherError::InvalidKeyLength(key.len());
    match key.len() {
        16 => Aes128CfbDec::new_from_slices(key, iv).map_err(invalid)?.decrypt(buf),
        24 => Aes192CfbDec::new_from_slices(key, iv).map_err(invalid)?.decrypt(buf),
        32 => Aes256CfbDec::new_from_slices(key, iv).map_err(invalid)?.decrypt(buf),
        n => return Err(CipherError::InvalidKeyLength(n)),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(s: &str) -> EncryptionKey {
        EncryptionKey::new(SecretString::from(s)).unwrap()
    }

    const KEY_256: &str = "0123456789abcdef0123456789abcdef";
    const FIXED_IV: [u8; BLOCK_SIZE] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
    const FIXED_PLAINTEXT: &str = "11a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7";
    const FIXED_CIPHERTEXT: &str =
        "AAECAwQFBgcICQoLDA0OD2Jsvcf0_FVQZQnie-O-2hmGFocB5JqGSQ2oAQI3bgxcd9gLppH0FoLxLDNT_Le91Q==";

    #[test]
    fn test_pad_full_block() {
        let padded = pad(&[1u8; 16]);
        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == 16));
    }

    #[test]
    fn test_pad_unpad() {
        let padded = pad(b"abc");
        assert_eq!(padded.len(), 16);
        assert_eq!(padded[15], 13);
        assert_eq!(unpad(&padded).unwrap(), b"abc");
    }

    #[test]
    fn test_unpad_rejects_bad_padding() {
        assert_eq!(unpad(&[]), Err(CipherError::Padding));
        assert_eq!(unpad(&[1, 2, 0]), Err(CipherError::Padding));
        assert_eq!(unpad(&[1, 2, 5]), Err(CipherError::Padding));
        assert_eq!(unpad(&[9, 3, 2, 3, 3]), Err(CipherError::Padding));

        assert_eq!(unpad(&[17u8; 32]), Err(CipherError::Padding));
    }

    #[test]
    fn test_roundtrip_all_key_sizes() {
        for k in ["0123456789abcdef", "enckeyenckeyenckeyenckey", KEY_256] {
            let key = key(k);
            let encrypted = encrypt(&key, "11a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7").unwrap();
            assert_eq!(
                decrypt(&key, &encrypted).unwrap(),
                "11a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7"
            );
        }
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let key = key(KEY_256);
        let first = encrypt(&key, "token").unwrap();
        let second = encrypt(&key, "token").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_known_ciphertext() {
        let key = key(KEY_256);
        let encrypted = encrypt_with_iv(&key, &FIXED_IV, FIXED_PLAINTEXT).unwrap();
        assert_eq!(encrypted, FIXED_CIPHERTEXT);
    }

    #[test]
    fn test_decrypts_existing_records() {
        // Written by an earlier deployment with an AES-192 key.
        let key = key("enckeyenckeyenckeyenckey");
        let token = decrypt(&key, "i1BmOxqUYk_6MtXJNTUtJIQbH2VikZkGPPycfIJhAaY=").unwrap();
        assert_eq!(token, "ewgwegweg");
    }

    #[test]
    fn test_wrong_key_is_an_error() {
        for wrong in [
            "fedcba9876543210fedcba9876543210",
            "enckeyenckeyenckeyenckey",
            "wrongkeywrongkey",
        ] {
            let result = decrypt(&key(wrong), FIXED_CIPHERTEXT);
            assert_eq!(result, Err(CipherError::Padding), "key {wrong}");
        }
    }

    #[test]
    fn test_decrypt_rejects_malformed_input() {
        let key = key(KEY_256);
        assert!(matches!(
            decrypt(&key, "not base64!"),
            Err(CipherError::Encoding(_))
        ));
        // One block: an IV with no message.
        assert_eq!(
            decrypt(&key, "AAECAwQFBgcICQoLDA0ODw=="),
            Err(CipherError::InvalidLength(16))
        );
        // IV plus a partial block.
        assert_eq!(
            decrypt(&key, "AAECAwQFBgcICQoLDA0OD2Jsvcf0"),
            Err(CipherError::InvalidLength(21))
        );
    }

    #[test]
    fn test_key_length_validation() {
        assert_eq!(
            EncryptionKey::new(SecretString::from("short")).unwrap_err(),
            CipherError::InvalidKeyLength(5)
        );
        assert!(format!("{:?}", key(KEY_256)).contains("[REDACTED]"));
    }
}
