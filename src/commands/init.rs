use repo_crypt::crypto_config::CryptoConfig;
use repo_crypt::error::Result;
use repo_crypt::git::GitRepo;
use repo_crypt::provider::{self, Provider};
use repo_crypt::settings::Settings;

/// Bootstrap repo-crypt in the current repository
pub fn init(settings: &Settings) -> Result<()> {
    println!("Initializing repo-crypt...");

    let repo = GitRepo::open(".")?;
    let root = repo.workdir()?;

    for path in repo.bootstrap_files()? {
        println!("Wrote {}", path.display());
    }

    // Configure git filters
    repo.configure_filters(&settings.program)?;
    println!("Configured git filters");

    let provider = provider::build(settings, root)?;
    if !CryptoConfig::exists(root) {
        CryptoConfig::new(provider.provider_type(), provider.id()).write(root)?;
        println!("Wrote {}", CryptoConfig::path(root).display());
    }

    println!("Key id: {}", provider.id());
    println!("\nInitialization complete!");
    println!("\nNext steps:");
    println!("1. Commit .gitattributes, .gitignore and crypto.yml");
    println!("2. Use 'repo-crypt setup-age' and 'repo-crypt share' to grant access to other users");

    Ok(())
}
