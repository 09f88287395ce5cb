//! # repo-crypt
//!
//! Transparent encryption of sensitive repository configuration (Helm values,
//! Terraform mains, workspace manifests) through git's clean/smudge filters.
//! Plaintext only ever exists in each collaborator's working tree.
//!
//! ## Quick Start
//!
//! ```bash
//! # Bootstrap filters, .gitattributes, .gitignore and crypto.yml
//! repo-crypt init
//! git add .gitattributes .gitignore crypto.yml
//! git commit -m "Configure repo-crypt"
//!
//! # Files matching .gitattributes are encrypted on commit
//! mkdir -p app/helm/app
//! echo "replicas: 3" > app/helm/app/values.yaml
//! git add app && git commit -m "Add values"
//! ```
//!
//! On another machine, import the key (or become a recipient, see below) and:
//!
//! ```bash
//! git clone <repository-url> && cd <repository>
//! repo-crypt unlock
//! ```
//!
//! ## Key Providers
//!
//! `crypto.yml` records which provider a repository uses and the fingerprint
//! of its key:
//!
//! - **raw**: every collaborator holds the same symmetric key in their
//!   profile (`~/.repo-crypt/key`), shared out of band with `export-key` and
//!   `import-key`, or through `backup create` / `backup restore`
//! - **multi-recipient**: the key is sealed inside
//!   `.repo-crypt/identities.yml` to a list of age X25519 recipients; anyone
//!   holding one of the identities can read it
//!
//! ```bash
//! repo-crypt publish-key --name laptop        # each user, once
//! repo-crypt setup-age --email me@example.com # once per repository
//! repo-crypt share --email alice@example.com --email bob@example.com
//! ```
//!
//! Every filter invocation rebuilds the provider and checks its fingerprint
//! against `crypto.yml`, so a wrong key fails loudly instead of producing
//! garbage.
//!
//! ## Cryptography Details
//!
//! - **Algorithm**: AES-256-GCM with a 16-byte nonce and 16-byte tag
//! - **Nonce**: first 16 bytes of HMAC-SHA256(key, plaintext), so unchanged
//!   files produce unchanged blobs
//! - **Fingerprint**: `SHA256:` + base64 of SHA-256 over the key
//!
//! ### Encrypted Blob Format
//!
//! ```text
//! [\0REPOCRYPT\0][16-byte nonce][ciphertext + 16-byte GCM tag]
//! ```
//!
//! ## Module Overview
//!
//! - [`crypto`] - Cipher engine and fingerprints
//! - [`key`] - Per-user symmetric key store
//! - [`identity`] - age identities and envelopes
//! - [`registry`] - Recipient registry for the multi-recipient provider
//! - [`provider`] - Provider selection and key-id verification
//! - [`crypto_config`] - `crypto.yml`
//! - [`git`] - Filters, textconv and repository bootstrap
//! - [`unlock`] - Crash-safe re-materialization of the working tree
//! - [`backup`] - Key backup and restore
//! - [`remote`] - Key service holding public keys and backups
//! - [`settings`] - Profile directory and configuration
//! - [`error`] - Error types

pub mod backup;
pub mod crypto;
pub mod crypto_config;
pub mod error;
pub mod git;
pub mod identity;
pub mod key;
pub mod logging;
pub mod provider;
pub mod registry;
pub mod remote;
pub mod settings;
pub mod unlock;

// Re-export commonly used types
pub use crypto::{Fingerprint, SymmetricKey};
pub use error::{RepoCryptError, Result};
pub use git::GitRepo;
pub use key::KeyStore;
pub use provider::{KeyProvider, Provider};
pub use settings::Settings;
