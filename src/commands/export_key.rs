use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use repo_crypt::error::Result;
use repo_crypt::key::KeyStore;
use repo_crypt::settings::Settings;

/// Export the symmetric key to a file, or stdout
pub fn export_key(settings: &Settings, output_path: Option<&Path>) -> Result<()> {
    let bytes = KeyStore::new(settings).export()?;

    match output_path {
        Some(path) => {
            fs::write(path, &bytes)?;
            println!("Key exported to: {}", path.display());
            println!("\nWARNING: Keep this key file secure!");
            println!("Anyone with this key can decrypt your encrypted files.");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Import a symmetric key from a file, or stdin
pub fn import_key(settings: &Settings, input_path: Option<&Path>) -> Result<()> {
    let bytes = match input_path {
        Some(path) => fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            buf
        }
    };

    let key = KeyStore::new(settings).import(&bytes)?;

    eprintln!("Key imported successfully!");
    eprintln!("Key id: {}", key.fingerprint());
    Ok(())
}
