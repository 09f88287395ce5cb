//! # Remote Key Service
//!
//! The collaborator that holds published public keys and key backups.
//!
//! [`KeyService`] is the boundary the rest of the crate talks to. The shipped
//! implementation, [`ObjectKeyService`], keeps small YAML documents in an
//! [`ObjectStore`]:
//!
//! ```text
//! public-keys/<sha256(email) hex>.yml   list of PublicKey
//! backups.yml                           list of KeyBackup
//! ```
//!
//! Two stores are available: a plain directory ([`LocalStore`]) and, with the
//! `remote-s3` feature, an S3 bucket ([`S3Store`]). All calls are synchronous
//! and never retried; failures surface as [`RepoCryptError::Remote`].

mod local;
#[cfg(feature = "remote-s3")]
mod s3;

pub use local::LocalStore;
#[cfg(feature = "remote-s3")]
pub use s3::S3Store;

use crate::error::{RepoCryptError, Result};
use crate::settings::{Backend, Settings};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

const PUBLIC_KEYS_PREFIX: &str = "public-keys";
const BACKUPS_DOC: &str = "backups.yml";

/// A published public key, owned by the user with `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub name: String,
    pub email: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBackup {
    pub name: String,
    pub digest: String,
    #[serde(default)]
    pub repositories: Vec<String>,
    pub value: String,
}

pub trait KeyService {
    /// Every key published by any of `emails`. Emails without keys are
    /// simply absent from the result.
    fn list_public_keys(&self, emails: &[String]) -> Result<Vec<PublicKey>>;

    /// Publish `content` under `name` for the current user, replacing a key
    /// of the same name.
    fn publish_public_key(&self, name: &str, content: &str) -> Result<()>;

    /// Store `backup`, replacing a backup of the same name.
    fn create_key_backup(&self, backup: KeyBackup) -> Result<()>;

    fn list_key_backups(&self) -> Result<Vec<KeyBackup>>;

    fn get_key_backup(&self, name: &str) -> Result<KeyBackup>;
}

/// Flat blob storage addressed by `/`-separated paths.
pub trait ObjectStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

pub struct ObjectKeyService<S> {
    store: S,
    owner: Option<String>,
}

impl<S: ObjectStore> ObjectKeyService<S> {
    /// `owner` is the email keys get published under.
    pub fn new(store: S, owner: Option<String>) -> Self {
        Self {
            store,
            owner: owner.map(|email| normalize_email(&email)),
        }
    }

    fn read_doc<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T> {
        match self.store.get(path)? {
            Some(bytes) => serde_yaml::from_slice(&bytes)
                .map_err(|e| RepoCryptError::Remote(format!("corrupt document {path}: {e}"))),
            None => Ok(T::default()),
        }
    }

    fn write_doc<T: Serialize>(&self, path: &str, doc: &T) -> Result<()> {
        self.store.put(path, serde_yaml::to_string(doc)?.as_bytes())
    }
}

impl<S: ObjectStore> KeyService for ObjectKeyService<S> {
    fn list_public_keys(&self, emails: &[String]) -> Result<Vec<PublicKey>> {
        let mut keys = Vec::new();
        for email in emails {
            let published: Vec<PublicKey> = self.read_doc(&public_keys_path(email))?;
            debug!(%email, count = published.len(), "looked up public keys");
            keys.extend(published);
        }
        Ok(keys)
    }

    fn publish_public_key(&self, name: &str, content: &str) -> Result<()> {
        let email = self.owner.as_deref().ok_or_else(|| {
            RepoCryptError::Remote(
                "No user email configured; set user.email or REPO_CRYPT_USER__EMAIL".into(),
            )
        })?;

        let path = public_keys_path(email);
        let mut keys: Vec<PublicKey> = self.read_doc(&path)?;
        keys.retain(|key| key.name != name);
        keys.push(PublicKey {
            name: name.to_string(),
            email: email.to_string(),
            content: content.trim().to_string(),
        });
        self.write_doc(&path, &keys)
    }

    fn create_key_backup(&self, backup: KeyBackup) -> Result<()> {
        let mut backups: Vec<KeyBackup> = self.read_doc(BACKUPS_DOC)?;
        backups.retain(|existing| existing.name != backup.name);
        backups.push(backup);
        self.write_doc(BACKUPS_DOC, &backups)
    }

    fn list_key_backups(&self) -> Result<Vec<KeyBackup>> {
        self.read_doc(BACKUPS_DOC)
    }

    fn get_key_backup(&self, name: &str) -> Result<KeyBackup> {
        self.list_key_backups()?
            .into_iter()
            .find(|backup| backup.name == name)
            .ok_or_else(|| RepoCryptError::BackupNotFound(name.to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn public_keys_path(email: &str) -> String {
    let digest = Sha256::digest(normalize_email(email).as_bytes());
    format!("{PUBLIC_KEYS_PREFIX}/{}.yml", hex::encode(digest))
}

/// Build the key service selected by `settings.remote`.
pub fn connect(settings: &Settings) -> Result<Box<dyn KeyService>> {
    let owner = settings.user.email.clone();
    match settings.remote.backend {
        Backend::Local => Ok(Box::new(ObjectKeyService::new(
            LocalStore::new(settings.registry_dir()),
            owner,
        ))),
        #[cfg(feature = "remote-s3")]
        Backend::S3 => {
            let s3 = settings.remote.s3.as_ref().ok_or_else(|| {
                RepoCryptError::Other("remote.backend is s3 but [remote.s3] is missing".into())
            })?;
            Ok(Box::new(ObjectKeyService::new(S3Store::new(s3)?, owner)))
        }
        #[cfg(not(feature = "remote-s3"))]
        Backend::S3 => Err(RepoCryptError::Other(
            "S3 support not enabled. Rebuild with --features remote-s3".into(),
        )),
    }
}
