use repo_crypt::error::{RepoCryptError, Result};
use repo_crypt::git::GitRepo;
use repo_crypt::provider::Provider;
use repo_crypt::registry;
use repo_crypt::remote;
use repo_crypt::settings::Settings;

fn user_email(settings: &Settings, email: Option<&str>) -> Result<String> {
    email
        .map(String::from)
        .or_else(|| settings.user.email.clone())
        .ok_or_else(|| {
            RepoCryptError::Other(
                "No email given; pass --email or set user.email in config.toml".into(),
            )
        })
}

/// Switch the current repository to the multi-recipient provider
pub fn setup_age(settings: &Settings, email: Option<&str>) -> Result<()> {
    let email = user_email(settings, email)?;
    let repo = GitRepo::open(".")?;

    let provider = registry::setup_age_config(settings, repo.workdir()?, &email)?;

    println!("Multi-recipient provider configured for {email}");
    println!("Key id: {}", provider.id());
    println!("\nCommit crypto.yml, .gitignore and .repo-crypt/identities.yml");
    Ok(())
}

/// Grant every email access to the repository key
pub fn share(settings: &Settings, emails: &[String]) -> Result<()> {
    let repo = GitRepo::open(".")?;
    let service = remote::connect(settings)?;

    let added = registry::share(settings, repo.workdir()?, service.as_ref(), emails)?;

    if added.is_empty() {
        println!("Every user already had access");
    }
    for recipient in added {
        println!(
            "Added {} ({})",
            recipient.email.as_deref().unwrap_or("-"),
            recipient.public_key
        );
    }
    Ok(())
}

/// Publish the user's public key to the key service
pub fn publish_key(settings: &Settings, name: &str) -> Result<()> {
    let service = remote::connect(settings)?;
    let public_key = registry::publish_identity(settings, service.as_ref(), name)?;

    println!("Published {public_key} as {name}");
    Ok(())
}

/// List everyone who can decrypt the repository key
pub fn recipients(settings: &Settings) -> Result<()> {
    let repo = GitRepo::open(".")?;

    for recipient in registry::recipients(settings, repo.workdir()?)? {
        match recipient.email {
            Some(email) => println!("{}\t{}", recipient.public_key, email),
            None => println!("{}\t(repository)", recipient.public_key),
        }
    }
    Ok(())
}
