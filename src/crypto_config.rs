//! Per-repository `crypto.yml`: which provider a repository was encrypted
//! with and the fingerprint of its key.
//!
//! The file is written once when a repository is set up and read on every
//! filter invocation. It is never migrated; switching provider type means
//! re-encrypting tracked content (or keeping the same key, as the
//! multi-recipient setup does).

use crate::crypto::Fingerprint;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "crypto.yml";
pub const CONFIG_VERSION: &str = "repo-crypt/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    Raw,
    MultiRecipient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoConfig {
    pub version: String,
    pub provider_type: ProviderType,
    pub key_id: Fingerprint,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl CryptoConfig {
    pub fn new(provider_type: ProviderType, key_id: Fingerprint) -> Self {
        Self {
            version: CONFIG_VERSION.into(),
            provider_type,
            key_id,
            context: BTreeMap::new(),
        }
    }

    pub fn path(repo_root: &Path) -> PathBuf {
        repo_root.join(CONFIG_FILE)
    }

    pub fn exists(repo_root: &Path) -> bool {
        Self::path(repo_root).exists()
    }

    /// Read the repository's config, if it has one.
    pub fn read(repo_root: &Path) -> Result<Option<Self>> {
        let path = Self::path(repo_root);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_yaml::from_str(&contents)?))
    }

    pub fn write(&self, repo_root: &Path) -> Result<()> {
        fs::write(Self::path(repo_root), serde_yaml::to_string(self)?)?;
        Ok(())
    }
}
