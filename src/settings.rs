//! # Settings
//!
//! Every path and remote endpoint the crate touches is resolved here once and
//! passed explicitly to constructors, so nothing reads the home directory or
//! process environment behind the caller's back.
//!
//! ## Sources (lowest to highest precedence)
//!
//! 1. Built-in defaults rooted at the profile directory
//! 2. `<profile>/config.toml`
//! 3. `REPO_CRYPT_*` environment variables, `__` separating nested keys
//!    (e.g. `REPO_CRYPT_USER__EMAIL`, `REPO_CRYPT_REMOTE__S3__BUCKET`)
//!
//! The profile directory is `$REPO_CRYPT_HOME` or `~/.repo-crypt`.

use crate::error::{RepoCryptError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const HOME_ENV: &str = "REPO_CRYPT_HOME";
const ENV_PREFIX: &str = "REPO_CRYPT";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_PROGRAM: &str = "repo-crypt";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UserSettings {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct S3Settings {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub scope: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    #[serde(default)]
    pub path_style: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RemoteSettings {
    #[serde(default)]
    pub backend: Backend,
    pub path: Option<PathBuf>,
    pub s3: Option<S3Settings>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    program: Option<String>,
    #[serde(default)]
    user: UserSettings,
    #[serde(default)]
    remote: RemoteSettings,
}

#[derive(Debug, Clone)]
pub struct Settings {
    home: PathBuf,
    /// Command git runs for the clean/smudge/textconv drivers.
    pub program: String,
    pub user: UserSettings,
    pub remote: RemoteSettings,
}

impl Settings {
    /// Resolve the profile directory and load settings from it.
    pub fn load() -> Result<Self> {
        let home = match env::var_os(HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or_else(|| RepoCryptError::Other("Could not determine home directory".into()))?
                .join(".repo-crypt"),
        };
        Self::load_from(home)
    }

    /// Load `config.toml` under `home`, layered under environment overrides.
    pub fn load_from(home: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();
        let config_path = home.join(CONFIG_FILE);
        let config_path = config_path
            .to_str()
            .ok_or_else(|| RepoCryptError::Other("Invalid config path".into()))?;

        let file: SettingsFile = Config::builder()
            .add_source(File::new(config_path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(Self {
            home,
            program: file.program.unwrap_or_else(|| DEFAULT_PROGRAM.into()),
            user: file.user,
            remote: file.remote,
        })
    }

    /// Defaults rooted at `home`, ignoring config files and environment.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            program: DEFAULT_PROGRAM.into(),
            user: UserSettings::default(),
            remote: RemoteSettings::default(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn key_path(&self) -> PathBuf {
        self.home.join("key")
    }

    pub fn identity_path(&self) -> PathBuf {
        self.home.join("identity")
    }

    /// Directory backing the local key service.
    pub fn registry_dir(&self) -> PathBuf {
        self.remote
            .path
            .clone()
            .unwrap_or_else(|| self.home.join("registry"))
    }
}
