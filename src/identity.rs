//! Long-lived X25519 identities and the age envelope used for the recipient
//! registry.
//!
//! Identity files follow the `age-keygen` layout:
//!
//! ```text
//! # created: 2026-01-01T00:00:00+00:00
//! # public key: age1...
//! AGE-SECRET-KEY-1...
//! ```

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::str::FromStr;

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::secrecy::ExposeSecret;
use age::{x25519, DecryptError, Decryptor, EncryptError, Encryptor};
use chrono::Utc;
use tracing::info;

use crate::error::{RepoCryptError, Result};
use crate::key::write_private;

pub struct Identity {
    inner: x25519::Identity,
}

impl Identity {
    pub fn generate() -> Self {
        Self {
            inner: x25519::Identity::generate(),
        }
    }

    /// Parse identity file contents, ignoring comment lines.
    pub fn parse(contents: &str) -> Result<Self> {
        let secret = contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .ok_or_else(|| RepoCryptError::Age("Identity file has no secret key".into()))?;

        let inner = x25519::Identity::from_str(secret)
            .map_err(|e| RepoCryptError::Age(format!("Invalid identity: {e}")))?;
        Ok(Self { inner })
    }

    pub fn public_key(&self) -> String {
        self.inner.to_public().to_string()
    }

    pub fn to_file_contents(&self) -> String {
        format!(
            "# created: {}\n# public key: {}\n{}\n",
            Utc::now().to_rfc3339(),
            self.public_key(),
            self.inner.to_string().expose_secret()
        )
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::parse(&fs::read_to_string(path)?).map(Some)
    }

    /// Load the identity at `path`, generating it on first use. An existing
    /// identity is never replaced.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if let Some(identity) = Self::load(path)? {
            return Ok(identity);
        }

        let identity = Self::generate();
        write_private(path, identity.to_file_contents().as_bytes())?;
        info!(path = %path.display(), public_key = %identity.public_key(), "generated identity");
        Ok(identity)
    }

    pub(crate) fn as_age(&self) -> &x25519::Identity {
        &self.inner
    }
}

pub fn parse_recipient(public_key: &str) -> Result<x25519::Recipient> {
    x25519::Recipient::from_str(public_key.trim())
        .map_err(|e| RepoCryptError::Age(format!("Invalid recipient {public_key}: {e}")))
}

/// Encrypt `plaintext` to every public key, ASCII-armored.
pub fn seal(plaintext: &[u8], public_keys: &[String]) -> Result<Vec<u8>> {
    let recipients = public_keys
        .iter()
        .map(|key| parse_recipient(key))
        .collect::<Result<Vec<_>>>()?;

    let encryptor =
        Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn age::Recipient))
            .map_err(map_encrypt_err)?;

    let mut sealed = Vec::new();
    let armored = ArmoredWriter::wrap_output(&mut sealed, Format::AsciiArmor)?;
    let mut writer = encryptor.wrap_output(armored)?;
    writer.write_all(plaintext)?;
    writer.finish()?.finish()?;

    Ok(sealed)
}

/// Decrypt an envelope with whichever of `identities` matches a recipient.
pub fn open(sealed: &[u8], identities: &[Identity]) -> Result<Vec<u8>> {
    if identities.is_empty() {
        return Err(RepoCryptError::MissingIdentity);
    }

    let decryptor =
        Decryptor::new(ArmoredReader::new(Cursor::new(sealed))).map_err(map_decrypt_err)?;
    let mut reader = decryptor
        .decrypt(identities.iter().map(|i| i.as_age() as &dyn age::Identity))
        .map_err(map_decrypt_err)?;

    let mut plaintext = Vec::new();
    reader.read_to_end(&mut plaintext)?;
    Ok(plaintext)
}

fn map_encrypt_err(err: EncryptError) -> RepoCryptError {
    RepoCryptError::Age(format!("age encryption failed: {err}"))
}

fn map_decrypt_err(err: DecryptError) -> RepoCryptError {
    match err {
        DecryptError::NoMatchingKeys => RepoCryptError::MissingIdentity,
        other => RepoCryptError::Age(format!("age decryption failed: {other}")),
    }
}
