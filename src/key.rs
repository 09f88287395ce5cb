//! # Symmetric Key Store
//!
//! The repository key lives once per user profile, never inside a repository.
//!
//! ## Key Storage
//!
//! - **Path**: `<profile>/key` (see [`Settings::key_path`])
//! - **Format**: YAML, `key: <base64 of 32 bytes>`
//! - **Permissions**: 0600 on Unix (owner read/write only)
//!
//! ## Key Operations
//!
//! - **Materialize**: load the key, creating and persisting a random one first if absent
//! - **Import**: overwrite the stored key from key-file bytes
//! - **Export**: serialize the stored key as key-file bytes
//!
//! Replacing the key file is the only rotation mechanism. Content encrypted
//! under the previous key stays unreadable unless that key is kept elsewhere
//! (see [`crate::backup`]).

use crate::crypto::SymmetricKey;
use crate::error::{RepoCryptError, Result};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    key: String,
}

/// Serialize a key in the on-disk key-file format.
pub fn encode_key_file(key: &SymmetricKey) -> Result<Vec<u8>> {
    let file = KeyFile {
        key: key.to_base64(),
    };
    Ok(serde_yaml::to_string(&file)?.into_bytes())
}

/// Parse key-file bytes.
pub fn decode_key_file(bytes: &[u8]) -> Result<SymmetricKey> {
    let file: KeyFile =
        serde_yaml::from_slice(bytes).map_err(|_| RepoCryptError::InvalidKeyFormat)?;
    SymmetricKey::from_base64(&file.key)
}

/// Write `contents` to `path`, creating parents. On Unix the file is only
/// ever readable by its owner, including while it is being written.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // An existing file keeps its mode on open; tighten it before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    file.flush()?;
    Ok(())
}

/// Key storage and management
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            path: settings.key_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored key, if one exists
    pub fn load(&self) -> Result<Option<SymmetricKey>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        decode_key_file(&bytes).map(Some)
    }

    /// Load the stored key or fail
    pub fn require(&self) -> Result<SymmetricKey> {
        self.load()?
            .ok_or_else(|| RepoCryptError::KeyNotFound(self.path.display().to_string()))
    }

    /// Load the key, generating and persisting a new one on first use
    pub fn materialize(&self) -> Result<SymmetricKey> {
        if let Some(key) = self.load()? {
            debug!(path = %self.path.display(), "loaded symmetric key");
            return Ok(key);
        }

        let key = SymmetricKey::generate();
        self.save(&key)?;
        info!(path = %self.path.display(), id = %key.fingerprint(), "generated new symmetric key");
        Ok(key)
    }

    /// Save a key to disk, replacing any existing one
    pub fn save(&self, key: &SymmetricKey) -> Result<()> {
        write_private(&self.path, &encode_key_file(key)?)
    }

    /// Import key-file bytes, overwriting the stored key
    pub fn import(&self, bytes: &[u8]) -> Result<SymmetricKey> {
        let key = decode_key_file(bytes)?;
        self.save(&key)?;
        info!(id = %key.fingerprint(), "imported symmetric key");
        Ok(key)
    }

    /// Export the stored key as key-file bytes
    pub fn export(&self) -> Result<Vec<u8>> {
        encode_key_file(&self.require()?)
    }
}
