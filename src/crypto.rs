//! # Cipher Engine
//!
//! Symmetric encryption of whole blobs with AES-256-GCM.
//!
//! ## Algorithm
//!
//! - **Cipher**: AES-256-GCM with a 128-bit nonce
//! - **Key size**: 256 bits (32 bytes)
//! - **Nonce**: first 16 bytes of `HMAC-SHA256(key, plaintext)`
//! - **Authentication**: 16-byte GCM tag
//!
//! ## Encrypted Data Format
//!
//! ```text
//! [16-byte nonce][variable-length ciphertext + 16-byte GCM tag]
//! ```
//!
//! The git filters prepend [`MARKER`](crate::git::MARKER) on top of this; the
//! engine itself never sees it.
//!
//! ## Deterministic nonces
//!
//! Git considers a file unchanged only when its cleaned blob is byte-identical,
//! so re-encrypting unmodified content must reproduce the same ciphertext. The
//! nonce is therefore a keyed hash of the plaintext: identical plaintext under
//! the same key yields identical ciphertext, and different plaintext always
//! yields a different nonce. The accepted cost is that two files encrypted
//! under one key reveal whether their contents are equal.

use crate::error::{RepoCryptError, Result};
use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit, OsRng},
    aes::Aes256,
    AesGcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const KEY_SIZE: usize = 32; // 256 bits
pub const NONCE_SIZE: usize = 16; // 128 bits
pub const TAG_SIZE: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;
type HmacSha256 = Hmac<Sha256>;

/// Stable identifier of a key: `SHA256:` followed by the base64 digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("SHA256:{}", STANDARD.encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone)]
pub struct SymmetricKey {
    key: [u8; KEY_SIZE],
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("id", &self.fingerprint())
            .finish()
    }
}

impl SymmetricKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create a key from existing bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(RepoCryptError::InvalidKeyFormat);
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| RepoCryptError::InvalidKeyFormat)?;
        Self::from_bytes(&bytes)
    }

    /// Get the key as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.key)
    }

    fn cipher(&self) -> Result<Aes256Gcm16> {
        Aes256Gcm16::new_from_slice(&self.key).map_err(|_| RepoCryptError::InvalidKeyFormat)
    }

    fn derive_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_SIZE]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|_| RepoCryptError::InvalidKeyFormat)?;
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&digest[..NONCE_SIZE]);
        Ok(nonce)
    }

    /// Encrypt data
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;
        let nonce_bytes = self.derive_nonce(plaintext)?;
        let nonce = Nonce::<U16>::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| RepoCryptError::Other(format!("encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypt data
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(RepoCryptError::MalformedCiphertext(format!(
                "expected at least {NONCE_SIZE} bytes, got {}",
                ciphertext.len()
            )));
        }

        let cipher = self.cipher()?;
        let (nonce_bytes, encrypted_data) = ciphertext.split_at(NONCE_SIZE);
        let nonce = Nonce::<U16>::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, encrypted_data)
            .map_err(|_| RepoCryptError::AuthenticationFailure)
    }
}
