use std::io;
use std::path::Path;

use repo_crypt::crypto::SymmetricKey;
use repo_crypt::error::Result;
use repo_crypt::git::{clean_filter, diff_filter, smudge_filter, GitRepo};
use repo_crypt::provider::{self, Provider};
use repo_crypt::settings::Settings;

fn repository_key(settings: &Settings) -> Result<SymmetricKey> {
    let repo = GitRepo::open(".")?;
    let provider = provider::build(settings, repo.workdir()?)?;
    Ok(provider.symmetric_key().clone())
}

/// Clean filter implementation (called by git during add/commit)
pub fn clean(settings: &Settings) -> Result<()> {
    let key = repository_key(settings)?;
    clean_filter(&key, io::stdin().lock(), io::stdout().lock())
}

/// Smudge filter implementation (called by git during checkout)
pub fn smudge(settings: &Settings) -> Result<()> {
    let key = repository_key(settings)?;
    smudge_filter(&key, io::stdin().lock(), io::stdout().lock())
}

/// Textconv implementation (called by git during diff)
pub fn diff(settings: &Settings, path: &Path) -> Result<()> {
    let key = repository_key(settings)?;
    diff_filter(&key, path, io::stdout().lock())
}
