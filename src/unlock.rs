//! # Unlock
//!
//! Rewrites every tracked file through the smudge filter so a fresh clone (or
//! a working tree checked out before the key was available) ends up in
//! plaintext.
//!
//! Git only re-smudges files it believes are stale, so the index is moved
//! aside before `git checkout HEAD -- .`. If the checkout fails the saved
//! index is put back, leaving the repository exactly as it was found.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{RepoCryptError, Result};
use crate::git::GitRepo;
use crate::provider::{self, Provider};
use crate::settings::Settings;

const INDEX_BACKUP_SUFFIX: &str = "repo-crypt.bak";

/// Verify the key, install the filters and re-materialize the working tree.
pub fn unlock(settings: &Settings, repo: &GitRepo) -> Result<()> {
    let root = repo.workdir()?;
    let provider = provider::build(settings, root)?;
    info!(id = %provider.id(), "unlocking with key");

    repo.configure_filters(&settings.program)?;
    force_checkout(&repo.index_path(), || repo.checkout_head())
}

/// Move `index_path` aside, run `checkout`, and restore the index if it fails.
pub fn force_checkout<F>(index_path: &Path, checkout: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let backup = backup_path(index_path);
    let had_index = index_path.exists();
    if had_index {
        fs::rename(index_path, &backup)?;
        debug!(backup = %backup.display(), "moved index aside");
    }

    match checkout() {
        Ok(()) => {
            if had_index {
                fs::remove_file(&backup)?;
            }
            Ok(())
        }
        Err(err) => {
            let restored = if had_index {
                fs::rename(&backup, index_path)
            } else if index_path.exists() {
                fs::remove_file(index_path)
            } else {
                Ok(())
            };

            match restored {
                Ok(()) => {
                    warn!("checkout failed, restored index");
                    Err(err)
                }
                Err(restore) => Err(RepoCryptError::IndexRestoreFailed {
                    checkout: Box::new(err),
                    backup: backup.display().to_string(),
                    restore,
                }),
            }
        }
    }
}

fn backup_path(index_path: &Path) -> PathBuf {
    let mut name = index_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".");
    name.push(INDEX_BACKUP_SUFFIX);
    index_path.with_file_name(name)
}
