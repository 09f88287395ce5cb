//! # Git Filter Adapter
//!
//! Exposes the cipher as git clean/smudge filters and a diff textconv, and
//! bootstraps the repository files that route content through them.
//!
//! ## Blob format
//!
//! ```text
//! [\0REPOCRYPT\0][16-byte nonce][ciphertext + 16-byte GCM tag]
//! ```
//!
//! The marker only distinguishes ciphertext from plaintext. Clean passes
//! marked input through untouched and smudge passes unmarked input through
//! untouched, so both are idempotent.
//!
//! Filters read all of stdin and write only the transformed bytes to stdout;
//! diagnostics go to stderr.

use crate::crypto::SymmetricKey;
use crate::error::{RepoCryptError, Result};
use git2::Repository;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub const MARKER: &[u8] = b"\0REPOCRYPT\0";
pub const FILTER_NAME: &str = "repo-crypt";

pub const GITATTRIBUTES: &str = "\
/**/helm/**/values.yaml filter=repo-crypt diff=repo-crypt
/**/helm/**/values.yaml* filter=repo-crypt diff=repo-crypt
/**/helm/**/default-values.yaml* filter=repo-crypt diff=repo-crypt
/**/terraform/main.tf filter=repo-crypt diff=repo-crypt
/**/terraform/main.tf* filter=repo-crypt diff=repo-crypt
/**/manifest.yaml filter=repo-crypt diff=repo-crypt
/**/output.yaml filter=repo-crypt diff=repo-crypt
/diffs/**/* filter=repo-crypt diff=repo-crypt
context.yaml filter=repo-crypt diff=repo-crypt
workspace.yaml filter=repo-crypt diff=repo-crypt
context.yaml* filter=repo-crypt diff=repo-crypt
workspace.yaml* filter=repo-crypt diff=repo-crypt
.gitattributes !filter !diff
";

pub const GITIGNORE: &str = "\
/**/.terraform
/**/.terraform*
/**/terraform.tfstate*
/bin
*~
.DS_Store
*.swp
context.yaml.bak*
workspace.yaml.bak*
.repo-crypt/identity
";

pub fn is_encrypted(data: &[u8]) -> bool {
    data.starts_with(MARKER)
}

/// Encrypt a blob for the object store. Already-marked input is returned as is.
pub fn encrypt_blob(key: &SymmetricKey, input: &[u8]) -> Result<Vec<u8>> {
    if is_encrypted(input) {
        return Ok(input.to_vec());
    }

    let encrypted = key.encrypt(input)?;
    let mut blob = Vec::with_capacity(MARKER.len() + encrypted.len());
    blob.extend_from_slice(MARKER);
    blob.extend_from_slice(&encrypted);
    Ok(blob)
}

/// Decrypt a blob for the working tree. Unmarked input is returned as is.
pub fn decrypt_blob(key: &SymmetricKey, input: &[u8]) -> Result<Vec<u8>> {
    match input.strip_prefix(MARKER) {
        Some(encrypted) => key.decrypt(encrypted),
        None => Ok(input.to_vec()),
    }
}

/// Clean filter: encrypt file content
pub fn clean_filter(key: &SymmetricKey, mut input: impl Read, mut output: impl Write) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    output.write_all(&encrypt_blob(key, &data)?)?;
    output.flush()?;
    Ok(())
}

/// Smudge filter: decrypt file content
pub fn smudge_filter(key: &SymmetricKey, mut input: impl Read, mut output: impl Write) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    output.write_all(&decrypt_blob(key, &data)?)?;
    output.flush()?;
    Ok(())
}

/// Textconv: print the plaintext of the file git hands us by path
pub fn diff_filter(key: &SymmetricKey, path: &Path, output: impl Write) -> Result<()> {
    smudge_filter(key, fs::File::open(path)?, output)
}

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open repository at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| RepoCryptError::NotInGitRepo)?;
        Ok(Self { repo })
    }

    /// Get the git directory path
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    pub fn index_path(&self) -> PathBuf {
        self.repo.path().join("index")
    }

    /// Get repository root path
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| RepoCryptError::Other("Repository has no working directory".into()))
    }

    /// Name of the repository, taken from its root directory
    pub fn name(&self) -> Option<String> {
        self.workdir()
            .ok()
            .and_then(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().to_string())
    }

    /// Bind the filter and diff drivers to `program`
    pub fn configure_filters(&self, program: &str) -> Result<()> {
        let mut config = self.repo.config()?;

        config.set_str(
            &format!("filter.{FILTER_NAME}.clean"),
            &format!("{program} clean"),
        )?;
        config.set_str(
            &format!("filter.{FILTER_NAME}.smudge"),
            &format!("{program} smudge"),
        )?;
        config.set_bool(&format!("filter.{FILTER_NAME}.required"), true)?;
        config.set_str(
            &format!("diff.{FILTER_NAME}.textconv"),
            &format!("{program} diff"),
        )?;

        debug!(%program, "configured git filters");
        Ok(())
    }

    /// Write the canonical `.gitattributes` and `.gitignore` where missing or
    /// different. Returns the files that were written.
    pub fn bootstrap_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.workdir()?;
        let mut written = Vec::new();
        for (name, contents) in [(".gitattributes", GITATTRIBUTES), (".gitignore", GITIGNORE)] {
            let path = root.join(name);
            let current = fs::read_to_string(&path).ok();
            if current.as_deref() != Some(contents) {
                fs::write(&path, contents)?;
                info!(path = %path.display(), "wrote canonical file");
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Run `git checkout HEAD -- .` from the repository root
    pub fn checkout_head(&self) -> Result<()> {
        let root = self.workdir()?;
        let output = Command::new("git")
            .args(["checkout", "HEAD", "--", "."])
            .current_dir(root)
            .output()?;

        if !output.status.success() {
            return Err(RepoCryptError::CommandFailed(format!(
                "git checkout HEAD: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Append `entry` to `<repo_root>/.gitignore` unless an identical line exists.
pub fn ensure_ignored(repo_root: &Path, entry: &str) -> Result<()> {
    let path = repo_root.join(".gitignore");
    let mut contents = fs::read_to_string(&path).unwrap_or_default();
    if contents.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(entry);
    contents.push('\n');
    fs::write(path, contents)?;
    Ok(())
}
