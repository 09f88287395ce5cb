//! Round-trips the local symmetric key through the remote key service.
//!
//! A backup stores the key file contents next to the key's fingerprint. On
//! restore the fingerprint is recomputed from the fetched key and must match
//! the recorded digest before anything is written locally.

use sha2::{Digest, Sha256};
use tracing::info;

use crate::crypto::SymmetricKey;
use crate::error::{RepoCryptError, Result};
use crate::key::{decode_key_file, encode_key_file, KeyStore};
use crate::remote::{KeyBackup, KeyService};
use crate::settings::Settings;

/// `key-` followed by the first 16 hex chars of the key's SHA-256.
pub fn default_name(key: &SymmetricKey) -> String {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("key-{}", &digest[..16])
}

/// Back up the stored key under `name` (or [`default_name`]), recording
/// `repository` when invoked inside one.
pub fn backup(
    settings: &Settings,
    service: &dyn KeyService,
    name: Option<&str>,
    repository: Option<&str>,
) -> Result<KeyBackup> {
    let key = KeyStore::new(settings).require()?;
    let backup = KeyBackup {
        name: name.map(String::from).unwrap_or_else(|| default_name(&key)),
        digest: key.fingerprint().to_string(),
        repositories: repository.map(|r| vec![r.to_string()]).unwrap_or_default(),
        value: String::from_utf8_lossy(&encode_key_file(&key)?).into_owned(),
    };

    service.create_key_backup(backup.clone())?;
    info!(name = %backup.name, digest = %backup.digest, "created key backup");
    Ok(backup)
}

/// Fetch `name`, verify its digest and overwrite the local key.
pub fn restore(settings: &Settings, service: &dyn KeyService, name: &str) -> Result<SymmetricKey> {
    let backup = service.get_key_backup(name)?;
    let key = decode_key_file(backup.value.as_bytes())?;

    let actual = key.fingerprint();
    if actual.as_str() != backup.digest {
        return Err(RepoCryptError::DigestMismatch {
            name: backup.name,
            expected: backup.digest,
            actual: actual.to_string(),
        });
    }

    KeyStore::new(settings).save(&key)?;
    info!(%name, id = %actual, "restored key backup");
    Ok(key)
}

pub fn list(service: &dyn KeyService) -> Result<Vec<KeyBackup>> {
    service.list_key_backups()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{LocalStore, ObjectKeyService};
    use tempfile::TempDir;

    fn service(remote: &TempDir) -> ObjectKeyService<LocalStore> {
        ObjectKeyService::new(LocalStore::new(remote.path()), None)
    }

    #[test]
    fn default_name_is_stable() {
        let key = SymmetricKey::from_bytes(&[7u8; 32]).unwrap();
        let name = default_name(&key);
        assert!(name.starts_with("key-"));
        assert_eq!(name.len(), 4 + 16);
        assert_eq!(name, default_name(&key));
    }

    #[test]
    fn backup_then_restore_on_another_machine() {
        let remote = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let settings = Settings::with_home(home.path());
        let key = KeyStore::new(&settings).materialize().unwrap();

        let created = backup(&settings, &service(&remote), None, Some("infra")).unwrap();
        assert_eq!(created.name, default_name(&key));
        assert_eq!(created.repositories, vec!["infra".to_string()]);

        let other_home = TempDir::new().unwrap();
        let other = Settings::with_home(other_home.path());
        KeyStore::new(&other).materialize().unwrap();

        let restored = restore(&other, &service(&remote), &created.name).unwrap();
        assert_eq!(restored.as_bytes(), key.as_bytes());
        assert_eq!(
            KeyStore::new(&other).require().unwrap().fingerprint(),
            key.fingerprint()
        );
    }

    #[test]
    fn backup_without_key_fails() {
        let remote = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let settings = Settings::with_home(home.path());

        assert!(matches!(
            backup(&settings, &service(&remote), Some("nothing"), None),
            Err(RepoCryptError::KeyNotFound(_))
        ));
        assert!(list(&service(&remote)).unwrap().is_empty());
    }

    #[test]
    fn restore_rejects_tampered_digest() {
        let remote = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let settings = Settings::with_home(home.path());
        let local = KeyStore::new(&settings).materialize().unwrap();

        let other = SymmetricKey::generate();
        service(&remote)
            .create_key_backup(KeyBackup {
                name: "tampered".into(),
                digest: other.fingerprint().to_string(),
                repositories: vec![],
                value: String::from_utf8(encode_key_file(&SymmetricKey::generate()).unwrap())
                    .unwrap(),
            })
            .unwrap();

        let err = restore(&settings, &service(&remote), "tampered").unwrap_err();
        assert!(matches!(err, RepoCryptError::DigestMismatch { .. }));
        assert_eq!(
            KeyStore::new(&settings).require().unwrap().as_bytes(),
            local.as_bytes()
        );
    }

    #[test]
    fn restore_unknown_name_fails() {
        let remote = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let settings = Settings::with_home(home.path());

        assert!(matches!(
            restore(&settings, &service(&remote), "missing"),
            Err(RepoCryptError::BackupNotFound(_))
        ));
    }

    #[test]
    fn list_shows_every_backup() {
        let remote = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let settings = Settings::with_home(home.path());
        KeyStore::new(&settings).materialize().unwrap();

        backup(&settings, &service(&remote), Some("first"), None).unwrap();
        backup(&settings, &service(&remote), Some("second"), None).unwrap();
        backup(&settings, &service(&remote), Some("first"), Some("infra")).unwrap();

        let names: Vec<String> = list(&service(&remote))
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["second".to_string(), "first".to_string()]);
    }
}
