use repo_crypt::backup;
use repo_crypt::error::Result;
use repo_crypt::git::GitRepo;
use repo_crypt::remote;
use repo_crypt::settings::Settings;

/// Back up the local key to the key service
pub fn create(settings: &Settings, name: Option<&str>) -> Result<()> {
    let service = remote::connect(settings)?;
    let repository = GitRepo::open(".").ok().and_then(|repo| repo.name());

    let created = backup::backup(settings, service.as_ref(), name, repository.as_deref())?;

    println!("Created backup {} ({})", created.name, created.digest);
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let service = remote::connect(settings)?;

    for backup in backup::list(service.as_ref())? {
        println!(
            "{}\t{}\t{}",
            backup.name,
            backup.digest,
            backup.repositories.join(",")
        );
    }
    Ok(())
}

/// Restore a backup over the local key
pub fn restore(settings: &Settings, name: &str) -> Result<()> {
    let service = remote::connect(settings)?;
    let key = backup::restore(settings, service.as_ref(), name)?;

    println!("Restored {name}");
    println!("Key id: {}", key.fingerprint());
    Ok(())
}
