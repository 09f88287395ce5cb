//! # Edge Case and Error Handling Tests
//!
//! Tests corner cases and error conditions to ensure robustness.
//!
//! ## Test Coverage
//!
//! - **Large files**: 10MB file encryption/decryption
//! - **Empty files**: Zero-byte file handling
//! - **Binary data**: Files with null bytes and all byte values
//! - **Data corruption**: Tamper and truncation detection
//! - **Concurrency**: Parallel filter processes sharing one key
//! - **Permissions**: Key file restricted to its owner (Unix)
//! - **Idempotency**: Repeated unlock and key operations
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test edge_cases_test
//! ```

mod common;

use common::{commit_all, create_git_repo, Profile, MARKER};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn initialized() -> (TempDir, TempDir, Profile) {
    let remote = TempDir::new().unwrap();
    let profile = Profile::new(remote.path());
    let repo = create_git_repo();
    profile.init(repo.path());
    (remote, repo, profile)
}

fn round_trip(profile: &Profile, dir: &Path, plaintext: &[u8]) -> Vec<u8> {
    let encrypted = profile.pipe(dir, &["clean"], plaintext);
    assert!(encrypted.status.success());

    let decrypted = profile.pipe(dir, &["smudge"], &encrypted.stdout);
    assert!(decrypted.status.success());
    decrypted.stdout
}

#[test]
fn test_very_large_file_encryption() {
    let (_remote, repo, profile) = initialized();
    let large_data = vec![0x42u8; 10 * 1024 * 1024];

    let decrypted = round_trip(&profile, repo.path(), &large_data);
    assert_eq!(decrypted.len(), large_data.len());
    assert_eq!(decrypted, large_data);
}

#[test]
fn test_empty_file_encryption() {
    let (_remote, repo, profile) = initialized();

    let encrypted = profile.pipe(repo.path(), &["clean"], b"");
    assert!(encrypted.status.success());
    assert!(encrypted.stdout.starts_with(MARKER));

    assert_eq!(round_trip(&profile, repo.path(), b""), b"");
}

#[test]
fn test_binary_file_with_null_bytes() {
    let (_remote, repo, profile) = initialized();
    let binary_data: Vec<u8> = vec![0x00, 0xFF, 0x00, 0x42, 0x00, 0x00, 0xAA, 0xBB];

    assert_eq!(round_trip(&profile, repo.path(), &binary_data), binary_data);
}

#[test]
fn test_special_characters_in_data() {
    let (_remote, repo, profile) = initialized();
    let special_data = b"Line1\nLine2\r\nTab\there\0null\x01\x02\x03\xFF";

    assert_eq!(round_trip(&profile, repo.path(), special_data), special_data);
}

#[test]
fn test_corrupted_encrypted_data() {
    let (_remote, repo, profile) = initialized();

    let encrypted = profile.pipe(repo.path(), &["clean"], b"Secret message").stdout;

    // Flip one byte in the nonce, the ciphertext and the tag
    for index in [MARKER.len(), MARKER.len() + 16, encrypted.len() - 1] {
        let mut corrupted = encrypted.clone();
        corrupted[index] ^= 0xFF;

        let output = profile.pipe(repo.path(), &["smudge"], &corrupted);
        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Authentication failed"));
    }
}

#[test]
fn test_truncated_encrypted_data() {
    let (_remote, repo, profile) = initialized();

    let mut truncated = MARKER.to_vec();
    truncated.extend_from_slice(&[0u8; 8]);

    let output = profile.pipe(repo.path(), &["smudge"], &truncated);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Malformed ciphertext"));
}

#[test]
fn test_export_key_to_existing_file() {
    let (_remote, repo, profile) = initialized();
    let key_file = repo.path().join("key.yml");

    for _ in 0..2 {
        profile
            .cmd()
            .arg("export-key")
            .arg(&key_file)
            .assert()
            .success()
            .stdout(predicate::str::contains("Keep this key file secure"));
    }

    assert_eq!(
        fs::read(&key_file).unwrap(),
        fs::read(profile.key_path()).unwrap()
    );
}

#[test]
fn test_invalid_command() {
    let remote = TempDir::new().unwrap();
    Profile::new(remote.path())
        .cmd()
        .arg("invalid-command")
        .assert()
        .failure();
}

#[test]
fn test_concurrent_operations() {
    use std::sync::Arc;
    use std::thread;

    let (_remote, repo, profile) = initialized();
    let profile = Arc::new(profile);
    let repo_path = repo.path().to_path_buf();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let profile = Arc::clone(&profile);
            let path = repo_path.clone();
            thread::spawn(move || {
                let data = format!("Thread {i} data");
                round_trip(&profile, &path, data.as_bytes()) == data.as_bytes()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[cfg(unix)]
#[test]
fn test_key_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (_remote, _repo, profile) = initialized();

    let mode = fs::metadata(profile.key_path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_unlock_idempotent() {
    let (_remote, repo, profile) = initialized();
    let values = repo.path().join("app/helm/app/values.yaml");
    fs::create_dir_all(values.parent().unwrap()).unwrap();
    fs::write(&values, "replicas: 3\n").unwrap();
    commit_all(&profile, repo.path(), "Add values");

    for _ in 0..3 {
        profile
            .cmd()
            .arg("unlock")
            .current_dir(repo.path())
            .assert()
            .success();
    }

    assert_eq!(fs::read_to_string(&values).unwrap(), "replicas: 3\n");
    let status = profile.git_ok(repo.path(), &["status", "--porcelain"]);
    assert!(status.stdout.is_empty());
}

#[test]
fn test_repeated_key_operations() {
    let (_remote, repo, profile) = initialized();
    let key_file = repo.path().join("key.yml");
    let id = profile.fingerprint(repo.path());

    for _ in 0..5 {
        profile
            .cmd()
            .arg("export-key")
            .arg(&key_file)
            .assert()
            .success();
        profile
            .cmd()
            .arg("import-key")
            .arg(&key_file)
            .assert()
            .success();
    }

    assert_eq!(profile.fingerprint(repo.path()), id);
}

#[test]
fn test_settings_file_overrides_program() {
    let remote = TempDir::new().unwrap();
    let profile = Profile::new(remote.path());
    fs::write(
        profile.home.path().join("config.toml"),
        "program = \"/opt/bin/repo-crypt\"\n",
    )
    .unwrap();

    let repo = create_git_repo();
    profile.init(repo.path());

    let clean = profile.git_ok(repo.path(), &["config", "filter.repo-crypt.smudge"]);
    assert_eq!(
        String::from_utf8_lossy(&clean.stdout).trim(),
        "/opt/bin/repo-crypt smudge"
    );
}
