#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use dialoguer::Password;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zeroize::Zeroizing;

use strongbox::config::AppConfig;
use strongbox::{PasswordConfig, VaultService};

#[derive(Parser)]
#[command(name = "strongbox", version, about = "A local encrypted credential vault")]
struct Cli {
    /// Directory holding the vault files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new vault
    Init {
        /// Replace an existing vault; its entries become unreadable
        #[arg(long)]
        force: bool,
    },
    /// List entries without their passwords
    List {
        /// Only show entries matching every word of this query
        query: Option<String>,
    },
    /// Print the password of one entry
    Show { entryname: String, username: String },
    /// Add an entry with a generated password
    Add {
        entryname: String,
        username: String,
        #[command(flatten)]
        generator: GeneratorArgs,
    },
    /// Delete an entry
    Remove { entryname: String, username: String },
    /// Replace the password of an entry with a generated one
    Regen {
        entryname: String,
        username: String,
        #[command(flatten)]
        generator: GeneratorArgs,
    },
    /// Change the master password
    Passwd,
    /// Print a generated password without storing it
    Generate {
        #[command(flatten)]
        generator: GeneratorArgs,
    },
}

#[derive(Args)]
struct GeneratorArgs {
    /// Number of characters
    #[arg(short, long, default_value_t = 20)]
    length: usize,
    /// Leave out lowercase letters
    #[arg(long)]
    no_lower: bool,
    /// Leave out uppercase letters
    #[arg(long)]
    no_upper: bool,
    /// Leave out digits
    #[arg(long)]
    no_digits: bool,
    /// Leave out special characters
    #[arg(long)]
    no_special: bool,
}

impl From<&GeneratorArgs> for PasswordConfig {
    fn from(args: &GeneratorArgs) -> Self {
        PasswordConfig {
            length: args.length,
            lowercase: !args.no_lower,
            uppercase: !args.no_upper,
            digits: !args.no_digits,
            specials: !args.no_special,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn prompt_master() -> anyhow::Result<Zeroizing<String>> {
    Password::new()
        .with_prompt("Master password")
        .interact()
        .map(Zeroizing::new)
        .context("Failed to read master password")
}

fn prompt_new_master() -> anyhow::Result<Zeroizing<String>> {
    Password::new()
        .with_prompt("New master password")
        .with_confirmation("Confirm master password", "Passwords do not match")
        .interact()
        .map(Zeroizing::new)
        .context("Failed to read master password")
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = if let Some(ref path) = cli.config {
        AppConfig::load_from(path)?
    } else {
        AppConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load config, using defaults");
            AppConfig::default()
        })
    };
    if let Some(ref dir) = cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let service = VaultService::from_config(&config);

    match &cli.command {
        Command::Init { force } => {
            if service.is_initialized() && !force {
                bail!(
                    "A vault already exists in {}; use --force to replace it",
                    config.data_dir.display()
                );
            }
            let master = prompt_new_master()?;
            service.initialize(&master)?;
            println!("Vault created in {}", config.data_dir.display());
        }
        Command::Generate { generator } => {
            println!("{}", VaultService::generate_password(&generator.into())?);
        }
        command => {
            if !service.is_initialized() {
                bail!(
                    "No vault in {}; run `strongbox init` first",
                    config.data_dir.display()
                );
            }
            run_unlocked(&service, command)?;
        }
    }
    Ok(())
}

fn run_unlocked(service: &VaultService, command: &Command) -> anyhow::Result<()> {
    let master = prompt_master()?;
    let mut session = service.unlock(&master)?;

    match command {
        Command::List { query } => {
            let today = Local::now().date_naive();
            for entry in session.search(query.as_deref().unwrap_or("")) {
                let age = entry
                    .age(today)
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "{:<22}  {:<32}  {}  {}",
                    entry.entryname, entry.username, entry.date, age
                );
            }
        }
        Command::Show {
            entryname,
            username,
        } => {
            let entry = session
                .get(entryname, username)
                .context("No such entry")?;
            println!("{}", entry.password);
        }
        Command::Add {
            entryname,
            username,
            generator,
        } => {
            session.add_entry(entryname, username, &generator.into())?;
            println!("Entry added");
        }
        Command::Remove {
            entryname,
            username,
        } => {
            session.delete_entry(entryname, username)?;
            println!("Entry removed");
        }
        Command::Regen {
            entryname,
            username,
            generator,
        } => {
            session.regenerate_password(entryname, username, &generator.into())?;
            println!("Password regenerated");
        }
        Command::Passwd => {
            let new_master = prompt_new_master()?;
            session.change_master_password(&new_master)?;
            println!("Master password changed");
        }
        Command::Init { .. } | Command::Generate { .. } => {}
    }

    session.lock();
    Ok(())
}
