use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoCryptError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Tag verification failed: wrong key or tampered ciphertext.
    #[error("Authentication failed: wrong key or corrupted ciphertext")]
    AuthenticationFailure,

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The locally available key is not the key this repository was encrypted with.
    #[error("Key fingerprint mismatch: repository expects {expected}, local key is {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("Some of the users {0:?} have no keys setup")]
    MissingPublicKey(Vec<String>),

    #[error("No local identity can decrypt the recipient registry")]
    MissingIdentity,

    #[error("Repository identity {actual} is not the registry's repository key {expected}")]
    RepoIdentityMismatch { expected: String, actual: String },

    #[error("age error: {0}")]
    Age(String),

    #[error("Remote key service error: {0}")]
    Remote(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid key format")]
    InvalidKeyFormat,

    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("No key backup named {0}")]
    BackupNotFound(String),

    #[error("Backup {name} digest {expected} does not match its key ({actual})")]
    DigestMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Checkout failed and the saved index could not be put back either.
    #[error("{checkout}; restoring the index from {backup} also failed: {restore}")]
    IndexRestoreFailed {
        checkout: Box<RepoCryptError>,
        backup: String,
        restore: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RepoCryptError>;
