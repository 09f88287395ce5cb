use repo_crypt::error::Result;
use repo_crypt::git::GitRepo;
use repo_crypt::provider::{self, Provider};
use repo_crypt::settings::Settings;

/// Print the key id in effect for the current repository
pub fn fingerprint(settings: &Settings) -> Result<()> {
    let repo = GitRepo::open(".")?;
    let provider = provider::build(settings, repo.workdir()?)?;
    println!("{}", provider.id());
    Ok(())
}
