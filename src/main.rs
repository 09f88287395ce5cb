mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use repo_crypt::logging;
use repo_crypt::settings::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repo-crypt")]
#[command(version)]
#[command(about = "Transparent encryption of repository configuration", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write .gitattributes/.gitignore, configure filters and record the key id
    Init,

    /// Install filters and decrypt every tracked file
    Unlock,

    /// Clean filter (used internally by git)
    Clean,

    /// Smudge filter (used internally by git)
    Smudge,

    /// Diff textconv (used internally by git)
    Diff {
        /// File to print in plaintext
        file: PathBuf,
    },

    /// Export the symmetric key (stdout if no path given)
    ExportKey {
        /// Output file path
        output: Option<PathBuf>,
    },

    /// Import a symmetric key (stdin if no path given)
    ImportKey {
        /// Input file path
        input: Option<PathBuf>,
    },

    /// Print the key id in effect for this repository
    Fingerprint,

    /// Switch this repository to age multi-recipient keys
    SetupAge {
        /// Email recorded for your identity (defaults to user.email)
        #[arg(long)]
        email: Option<String>,
    },

    /// Grant users access to this repository's key
    Share {
        /// Emails of users who have published a key
        #[arg(long = "email", required = true)]
        emails: Vec<String>,
    },

    /// Publish your public key so others can share with you
    PublishKey {
        /// Name of this key, e.g. the machine it lives on
        #[arg(long, default_value = "default")]
        name: String,
    },

    /// List everyone who can decrypt this repository's key
    Recipients,

    /// Back up or restore the symmetric key
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Back up the local key
    Create {
        #[arg(long)]
        name: Option<String>,
    },

    /// List backups
    List,

    /// Restore a backup over the local key
    Restore { name: String },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = Settings::load()?;

    match cli.command {
        Commands::Init => commands::init(&settings)?,
        Commands::Unlock => commands::unlock(&settings)?,
        Commands::Clean => commands::clean(&settings)?,
        Commands::Smudge => commands::smudge(&settings)?,
        Commands::Diff { file } => commands::diff(&settings, &file)?,
        Commands::ExportKey { output } => commands::export_key(&settings, output.as_deref())?,
        Commands::ImportKey { input } => commands::import_key(&settings, input.as_deref())?,
        Commands::Fingerprint => commands::fingerprint(&settings)?,
        Commands::SetupAge { email } => commands::setup_age(&settings, email.as_deref())?,
        Commands::Share { emails } => commands::share(&settings, &emails)?,
        Commands::PublishKey { name } => commands::publish_key(&settings, &name)?,
        Commands::Recipients => commands::recipients(&settings)?,
        Commands::Backup(BackupCommands::Create { name }) => {
            commands::backup::create(&settings, name.as_deref())?
        }
        Commands::Backup(BackupCommands::List) => commands::backup::list(&settings)?,
        Commands::Backup(BackupCommands::Restore { name }) => {
            commands::backup::restore(&settings, &name)?
        }
    }

    Ok(())
}
