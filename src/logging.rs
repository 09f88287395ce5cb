//! Diagnostics for the binary. Everything goes to stderr: git reads filter
//! output from stdout, so a single stray byte there corrupts a blob.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "REPO_CRYPT_LOG";

/// Install the global subscriber. `--verbose` overrides `REPO_CRYPT_LOG`.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
