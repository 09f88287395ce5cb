use super::ObjectStore;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Object store backed by a directory, e.g. a shared mount.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

impl ObjectStore for LocalStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.resolve(path);
        if !file.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(file)?))
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let file = self.resolve(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, bytes)?;
        Ok(())
    }
}
