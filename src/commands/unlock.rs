use repo_crypt::error::Result;
use repo_crypt::git::GitRepo;
use repo_crypt::settings::Settings;

/// Unlock the repository (decrypt every tracked file in place)
pub fn unlock(settings: &Settings) -> Result<()> {
    println!("Unlocking repository...");

    let repo = GitRepo::open(".")?;
    repo_crypt::unlock::unlock(settings, &repo)?;

    println!("Repository unlocked successfully!");
    Ok(())
}
