use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Output, Stdio};
use tempfile::TempDir;

#[allow(dead_code)]
pub const MARKER: &[u8] = b"\0REPOCRYPT\0";

/// Create a new temporary git repository with user config set.
pub fn create_git_repo() -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");
    init_git_repo(temp.path());
    temp
}

pub fn init_git_repo(path: &Path) {
    for args in [
        &["init", "-q"][..],
        &["config", "user.email", "test@example.com"],
        &["config", "user.name", "Test User"],
    ] {
        let status = StdCommand::new("git")
            .args(args)
            .current_dir(path)
            .status()
            .expect("failed to run git");
        assert!(status.success(), "git {args:?} failed");
    }
}

/// Absolute path to the repo-crypt test binary.
#[allow(dead_code)]
pub fn repo_crypt_bin() -> &'static str {
    env!("CARGO_BIN_EXE_repo-crypt")
}

/// PATH with the test binary's directory first, so git can run the filters.
fn path_with_bin() -> OsString {
    let bin_dir = PathBuf::from(repo_crypt_bin())
        .parent()
        .expect("binary has a parent dir")
        .to_path_buf();
    let mut paths = vec![bin_dir];
    if let Some(path) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&path));
    }
    std::env::join_paths(paths).expect("valid PATH")
}

/// An isolated user profile (`REPO_CRYPT_HOME`) sharing a key-service
/// directory with other profiles created from the same `remote`.
pub struct Profile {
    pub home: TempDir,
    remote: PathBuf,
    email: Option<String>,
}

#[allow(dead_code)]
impl Profile {
    pub fn new(remote: &Path) -> Self {
        Self {
            home: TempDir::new().expect("failed to create profile dir"),
            remote: remote.to_path_buf(),
            email: None,
        }
    }

    pub fn with_email(remote: &Path, email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::new(remote)
        }
    }

    fn envs(&self) -> Vec<(&'static str, OsString)> {
        let mut envs = vec![
            ("REPO_CRYPT_HOME", self.home.path().as_os_str().to_owned()),
            ("REPO_CRYPT_REMOTE__PATH", self.remote.as_os_str().to_owned()),
            ("PATH", path_with_bin()),
        ];
        if let Some(email) = &self.email {
            envs.push(("REPO_CRYPT_USER__EMAIL", email.into()));
        }
        envs
    }

    /// The repo-crypt binary running as this profile.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("repo-crypt");
        cmd.envs(self.envs());
        cmd
    }

    /// git running as this profile, so its filters use this profile's key.
    pub fn git(&self, dir: &Path, args: &[&str]) -> Output {
        StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .envs(self.envs())
            .output()
            .expect("failed to run git")
    }

    /// Like [`Profile::git`], asserting success.
    pub fn git_ok(&self, dir: &Path, args: &[&str]) -> Output {
        let output = self.git(dir, args);
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    /// Pipe `input` through `repo-crypt <args>` in `dir`.
    pub fn pipe(&self, dir: &Path, args: &[&str], input: &[u8]) -> Output {
        let mut child = StdCommand::new(repo_crypt_bin())
            .args(args)
            .current_dir(dir)
            .envs(self.envs())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn repo-crypt");

        // A failing filter may exit before reading its input
        let _ = child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input);
        child.wait_with_output().expect("failed to wait")
    }

    pub fn key_path(&self) -> PathBuf {
        self.home.path().join("key")
    }

    /// `repo-crypt init` in `dir`, asserting success.
    pub fn init(&self, dir: &Path) {
        self.cmd().arg("init").current_dir(dir).assert().success();
    }

    pub fn fingerprint(&self, dir: &Path) -> String {
        let output = self
            .cmd()
            .arg("fingerprint")
            .current_dir(dir)
            .output()
            .expect("failed to run fingerprint");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

/// Commit every change in `dir` as `profile`.
#[allow(dead_code)]
pub fn commit_all(profile: &Profile, dir: &Path, message: &str) {
    profile.git_ok(dir, &["add", "-A"]);
    profile.git_ok(dir, &["commit", "-q", "-m", message]);
}

/// Clone `source` into a fresh directory with user config set.
#[allow(dead_code)]
pub fn clone_repo(profile: &Profile, source: &Path) -> TempDir {
    let target = TempDir::new().expect("failed to create clone dir");
    let dest = target.path().join("clone");
    profile.git_ok(
        target.path(),
        &[
            "clone",
            "-q",
            source.to_str().expect("utf-8 path"),
            dest.to_str().expect("utf-8 path"),
        ],
    );
    profile.git_ok(&dest, &["config", "user.email", "clone@example.com"]);
    profile.git_ok(&dest, &["config", "user.name", "Clone User"]);
    target
}

/// Working tree of a clone made by [`clone_repo`].
#[allow(dead_code)]
pub fn clone_dir(target: &TempDir) -> PathBuf {
    target.path().join("clone")
}
