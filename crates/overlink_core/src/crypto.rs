//! crates/overlink_core/src/crypto.rs
//!
//! Authenticated encryption of Overleaf credentials at rest.
//!
//! Secrets are sealed with AES-256-GCM under a single server-held key and
//! stored as `<nonce-hex>:<tag-hex>:<ciphertext-hex>`. The external build
//! worker opens the same envelope with the same key, so the layout and key
//! derivation (raw key bytes, no KDF) must stay fixed.

use std::fmt;

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

const SEPARATOR: char = ':';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key length; expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("malformed envelope: {0}")]
    Format(String),
    #[error("envelope failed authentication")]
    Authentication,
    #[error("decrypted secret is not valid UTF-8")]
    Encoding,
}

/// Seals and opens credential envelopes with one process-wide key.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Builds a cipher from raw key bytes. The key must be exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(key.len()));
        }
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn encrypt_to_string(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            // Only reachable for plaintexts beyond GCM's ~64 GiB limit.
            .map_err(|_| CipherError::Format("plaintext too long".to_string()))?;

        Ok(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(buffer)
        ))
    }

    /// Opens an envelope produced by [`encrypt_to_string`](Self::encrypt_to_string).
    pub fn decrypt_from_string(&self, envelope: &str) -> Result<String, CipherError> {
        let parts: Vec<&str> = envelope.split(SEPARATOR).collect();
        let [nonce_hex, tag_hex, body_hex] = parts.as_slice() else {
            return Err(CipherError::Format(format!(
                "expected 3 fields, found {}",
                parts.len()
            )));
        };

        let nonce = decode_field("nonce", nonce_hex, Some(NONCE_LEN))?;
        let tag = decode_field("tag", tag_hex, Some(TAG_LEN))?;
        let mut buffer = decode_field("ciphertext", body_hex, None)?;

        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| CipherError::Authentication)?;

        String::from_utf8(buffer).map_err(|_| CipherError::Encoding)
    }
}

fn decode_field(name: &str, value: &str, expected_len: Option<usize>) -> Result<Vec<u8>, CipherError> {
    let bytes =
        hex::decode(value).map_err(|e| CipherError::Format(format!("{name} is not hex: {e}")))?;
    match expected_len {
        Some(len) if bytes.len() != len => Err(CipherError::Format(format!(
            "{name} must be {len} bytes, got {}",
            bytes.len()
        ))),
        _ => Ok(bytes),
    }
}
