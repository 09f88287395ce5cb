//! # Identity & Recipient Registry
//!
//! Backs the multi-recipient provider. The registry is a YAML document
//! holding the repository's symmetric key and the public keys allowed to read
//! it, stored in the repository as an age envelope sealed to every recipient:
//!
//! ```text
//! <repo>/.repo-crypt/identities.yml   sealed registry (committed)
//! <repo>/.repo-crypt/identity         repository identity (gitignored)
//! <profile>/identity                  user identity, shared by all repositories
//! ```
//!
//! The repository identity is always a recipient, so an automated agent that
//! only holds that identity can decrypt without being a shared user.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crypto::SymmetricKey;
use crate::crypto_config::{CryptoConfig, ProviderType};
use crate::error::{RepoCryptError, Result};
use crate::git::ensure_ignored;
use crate::identity::{self, Identity};
use crate::provider::{self, MultiRecipientProvider, Provider};
use crate::remote::KeyService;
use crate::settings::Settings;

pub const REGISTRY_DIR: &str = ".repo-crypt";
pub const REGISTRY_FILE: &str = "identities.yml";
pub const REPO_IDENTITY_FILE: &str = "identity";

pub fn registry_path(repo_root: &Path) -> PathBuf {
    repo_root.join(REGISTRY_DIR).join(REGISTRY_FILE)
}

pub fn repo_identity_path(repo_root: &Path) -> PathBuf {
    repo_root.join(REGISTRY_DIR).join(REPO_IDENTITY_FILE)
}

/// Repository-relative path of the repository identity, as ignored by git.
pub fn repo_identity_entry() -> String {
    format!("{REGISTRY_DIR}/{REPO_IDENTITY_FILE}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RecipientRegistry {
    pub repo_public_key: String,
    #[serde(default)]
    recipients: Vec<Recipient>,
    key: String,
}

impl RecipientRegistry {
    pub fn new(repo_public_key: impl Into<String>, key: &SymmetricKey) -> Self {
        Self {
            repo_public_key: repo_public_key.into(),
            recipients: Vec::new(),
            key: key.to_base64(),
        }
    }

    pub fn symmetric_key(&self) -> Result<SymmetricKey> {
        SymmetricKey::from_base64(&self.key)
    }

    /// The repository identity followed by every explicitly granted recipient.
    pub fn recipients(&self) -> Vec<Recipient> {
        let mut all = vec![Recipient {
            public_key: self.repo_public_key.clone(),
            email: None,
        }];
        for recipient in &self.recipients {
            if !all.iter().any(|r| r.public_key == recipient.public_key) {
                all.push(recipient.clone());
            }
        }
        all
    }

    /// Add a recipient; returns false if its key was already present.
    pub fn add(&mut self, recipient: Recipient) -> bool {
        if recipient.public_key == self.repo_public_key
            || self
                .recipients
                .iter()
                .any(|r| r.public_key == recipient.public_key)
        {
            return false;
        }
        self.recipients.push(recipient);
        true
    }

    pub fn to_yaml(&self) -> Result<Vec<u8>> {
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    /// Encrypt the registry to all of its recipients.
    pub fn seal(&self) -> Result<Vec<u8>> {
        let public_keys: Vec<String> = self
            .recipients()
            .into_iter()
            .map(|r| r.public_key)
            .collect();
        identity::seal(&self.to_yaml()?, &public_keys)
    }

    pub fn unseal(sealed: &[u8], identities: &[Identity]) -> Result<Self> {
        let plaintext = identity::open(sealed, identities)?;
        Ok(serde_yaml::from_slice(&plaintext)?)
    }

    pub fn load(repo_root: &Path, identities: &[Identity]) -> Result<Self> {
        let path = registry_path(repo_root);
        if !path.exists() {
            return Err(RepoCryptError::Other(format!(
                "Recipient registry not found at {}; run 'repo-crypt setup-age' first",
                path.display()
            )));
        }
        Self::unseal(&fs::read(path)?, identities)
    }

    pub fn save(&self, repo_root: &Path) -> Result<()> {
        let path = registry_path(repo_root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.seal()?)?;
        Ok(())
    }
}

/// Every identity available locally: the user identity and, when present,
/// the repository identity. Neither is generated here.
pub fn local_identities(settings: &Settings, repo_root: &Path) -> Result<Vec<Identity>> {
    let mut identities = Vec::new();
    if let Some(user) = Identity::load(&settings.identity_path())? {
        identities.push(user);
    }
    if let Some(repo) = Identity::load(&repo_identity_path(repo_root))? {
        identities.push(repo);
    }
    Ok(identities)
}

/// Switch `repo_root` to the multi-recipient provider.
///
/// Seeds the registry with the key of the provider currently in effect, so
/// existing ciphertext stays readable, or reopens the committed registry with
/// the local identities. The repository identity is only generated when a new
/// registry is seeded; a clone never holds it unless it was handed over, and
/// one that is present must be the registry's. The current user is added as a
/// recipient, the provider is recorded in `crypto.yml` and the repository
/// identity is kept out of git.
pub fn setup_age_config(
    settings: &Settings,
    repo_root: &Path,
    current_user_email: &str,
) -> Result<MultiRecipientProvider> {
    let repo_identity_file = repo_identity_path(repo_root);

    let mut registry = if registry_path(repo_root).exists() {
        let identities = local_identities(settings, repo_root)?;
        let registry = RecipientRegistry::load(repo_root, &identities)?;
        verify_key_id(repo_root, &registry)?;
        if let Some(repo_identity) = Identity::load(&repo_identity_file)? {
            verify_repo_identity(&registry, &repo_identity)?;
        }
        registry
    } else {
        let current = provider::build(settings, repo_root)?;
        let repo_identity = Identity::load_or_generate(&repo_identity_file)?;
        RecipientRegistry::new(repo_identity.public_key(), current.symmetric_key())
    };

    let user = Identity::load_or_generate(&settings.identity_path())?;
    registry.add(Recipient {
        public_key: user.public_key(),
        email: Some(current_user_email.trim().to_string()),
    });
    registry.save(repo_root)?;

    let key = registry.symmetric_key()?;
    let mut config = CryptoConfig::new(ProviderType::MultiRecipient, key.fingerprint());
    config.context.insert(
        "registry".into(),
        format!("{REGISTRY_DIR}/{REGISTRY_FILE}"),
    );
    config.write(repo_root)?;

    ensure_ignored(repo_root, &repo_identity_entry())?;

    info!(id = %key.fingerprint(), "configured multi-recipient provider");
    MultiRecipientProvider::new(registry)
}

/// The registry key must be the one `crypto.yml` records, if it records one.
fn verify_key_id(repo_root: &Path, registry: &RecipientRegistry) -> Result<()> {
    let Some(config) = CryptoConfig::read(repo_root)? else {
        return Ok(());
    };
    let actual = registry.symmetric_key()?.fingerprint();
    if actual != config.key_id {
        return Err(RepoCryptError::FingerprintMismatch {
            expected: config.key_id.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn verify_repo_identity(registry: &RecipientRegistry, repo_identity: &Identity) -> Result<()> {
    let actual = repo_identity.public_key();
    if actual != registry.repo_public_key {
        return Err(RepoCryptError::RepoIdentityMismatch {
            expected: registry.repo_public_key.clone(),
            actual,
        });
    }
    Ok(())
}

/// Grant every user in `emails` access to the repository key.
///
/// Fails with [`RepoCryptError::MissingPublicKey`] naming every email without a
/// published key, and with [`RepoCryptError::FingerprintMismatch`] when the
/// registry does not hold the key `crypto.yml` records. Either way the
/// registry is left untouched. Returns the recipients that
/// were newly added.
pub fn share(
    settings: &Settings,
    repo_root: &Path,
    service: &dyn KeyService,
    emails: &[String],
) -> Result<Vec<Recipient>> {
    let identities = local_identities(settings, repo_root)?;
    let mut registry = RecipientRegistry::load(repo_root, &identities)?;
    verify_key_id(repo_root, &registry)?;

    let keys = service.list_public_keys(emails)?;
    let missing: Vec<String> = emails
        .iter()
        .filter(|email| {
            !keys
                .iter()
                .any(|key| key.email.eq_ignore_ascii_case(email.trim()))
        })
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RepoCryptError::MissingPublicKey(missing));
    }

    let mut added = Vec::new();
    for key in keys {
        identity::parse_recipient(&key.content)?;
        let recipient = Recipient {
            public_key: key.content,
            email: Some(key.email),
        };
        if registry.add(recipient.clone()) {
            added.push(recipient);
        }
    }

    registry.save(repo_root)?;
    info!(added = added.len(), "shared repository key");
    Ok(added)
}

/// Generate the user identity if needed and publish its public half under
/// `name`. Returns the published public key.
pub fn publish_identity(
    settings: &Settings,
    service: &dyn KeyService,
    name: &str,
) -> Result<String> {
    let identity = Identity::load_or_generate(&settings.identity_path())?;
    let public_key = identity.public_key();
    service.publish_public_key(name, &public_key)?;
    info!(%name, %public_key, "published identity");
    Ok(public_key)
}

/// Recipients of the repository's registry, repository identity first.
pub fn recipients(settings: &Settings, repo_root: &Path) -> Result<Vec<Recipient>> {
    let identities = local_identities(settings, repo_root)?;
    Ok(RecipientRegistry::load(repo_root, &identities)?.recipients())
}
