//! # Key Providers
//!
//! A provider yields the repository's symmetric key, a fingerprint that
//! identifies it, and a serializable descriptor. Two providers exist:
//!
//! - [`RawKeyProvider`]: the user's local key from the key store
//! - [`MultiRecipientProvider`]: the key sealed in the repository's recipient
//!   registry, readable by any recipient identity
//!
//! [`build`] picks the provider recorded in `crypto.yml` and refuses to
//! return one whose fingerprint disagrees with the recorded `key_id`. That
//! comparison is the only check that a user holds the right key for a
//! repository.

use std::path::Path;

use tracing::debug;

use crate::crypto::{Fingerprint, SymmetricKey};
use crate::crypto_config::{CryptoConfig, ProviderType};
use crate::error::{RepoCryptError, Result};
use crate::key::{encode_key_file, KeyStore};
use crate::registry::{local_identities, RecipientRegistry};
use crate::settings::Settings;

pub trait Provider {
    fn id(&self) -> Fingerprint;
    fn symmetric_key(&self) -> &SymmetricKey;
    /// Plaintext descriptor of the provider's key material.
    fn marshal(&self) -> Result<Vec<u8>>;
}

pub struct RawKeyProvider {
    key: SymmetricKey,
}

impl RawKeyProvider {
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }
}

impl Provider for RawKeyProvider {
    fn id(&self) -> Fingerprint {
        self.key.fingerprint()
    }

    fn symmetric_key(&self) -> &SymmetricKey {
        &self.key
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        encode_key_file(&self.key)
    }
}

pub struct MultiRecipientProvider {
    registry: RecipientRegistry,
    key: SymmetricKey,
}

impl MultiRecipientProvider {
    pub fn new(registry: RecipientRegistry) -> Result<Self> {
        let key = registry.symmetric_key()?;
        Ok(Self { registry, key })
    }

    pub fn registry(&self) -> &RecipientRegistry {
        &self.registry
    }
}

impl Provider for MultiRecipientProvider {
    fn id(&self) -> Fingerprint {
        self.key.fingerprint()
    }

    fn symmetric_key(&self) -> &SymmetricKey {
        &self.key
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        self.registry.to_yaml()
    }
}

pub enum KeyProvider {
    Raw(RawKeyProvider),
    MultiRecipient(MultiRecipientProvider),
}

impl KeyProvider {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            KeyProvider::Raw(_) => ProviderType::Raw,
            KeyProvider::MultiRecipient(_) => ProviderType::MultiRecipient,
        }
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            KeyProvider::Raw(p) => p,
            KeyProvider::MultiRecipient(p) => p,
        }
    }
}

impl Provider for KeyProvider {
    fn id(&self) -> Fingerprint {
        self.inner().id()
    }

    fn symmetric_key(&self) -> &SymmetricKey {
        self.inner().symmetric_key()
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        self.inner().marshal()
    }
}

/// Build the provider in effect for `repo_root`.
///
/// Without a `crypto.yml` the local key is used as a raw provider (first-time
/// setup). Otherwise the recorded provider type is reconstructed and its
/// fingerprint must match the recorded `key_id`.
pub fn build(settings: &Settings, repo_root: &Path) -> Result<KeyProvider> {
    let local_key = KeyStore::new(settings).materialize()?;
    let local_id = local_key.fingerprint();

    let Some(config) = CryptoConfig::read(repo_root)? else {
        debug!(id = %local_id, "no crypto.yml, using local key");
        return Ok(KeyProvider::Raw(RawKeyProvider::new(local_key)));
    };

    let provider = match config.provider_type {
        ProviderType::Raw => KeyProvider::Raw(RawKeyProvider::new(local_key)),
        ProviderType::MultiRecipient => {
            let identities = local_identities(settings, repo_root)?;
            let registry = RecipientRegistry::load(repo_root, &identities)?;
            KeyProvider::MultiRecipient(MultiRecipientProvider::new(registry)?)
        }
    };

    let actual = provider.id();
    if actual != config.key_id {
        return Err(RepoCryptError::FingerprintMismatch {
            expected: config.key_id.to_string(),
            actual: actual.to_string(),
        });
    }

    debug!(id = %actual, provider = ?config.provider_type, "built key provider");
    Ok(provider)
}
