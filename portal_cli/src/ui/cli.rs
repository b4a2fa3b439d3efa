use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use portal_core::storage::{validate_ipv4, UnknownKeyKind};
use portal_core::utils::logging::init_logging;
use portal_core::{AppConfig, KeyKind, Mutation, ProfileEdit, ProfileStore};

use super::menu::{connection_table, Menu};
use super::session;
use super::App;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ssh-portal", version, about = "Named SSH connection profiles and interactive shells")]
pub struct Args {
    /// Config file (default: <config dir>/ssh_portal/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Profile file, overrides `profiles_file` from the config
    #[arg(long, global = true)]
    pub profiles: Option<PathBuf>,
    /// Without a command the interactive menu starts
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored connections
    List,
    /// Create a connection, replacing one with the same name
    Create {
        #[arg(long)]
        name: String,
        /// IPv4 address of the host
        #[arg(long)]
        address: String,
        #[arg(long)]
        username: String,
        /// Password, or key file path when --key-kind is set
        #[arg(long, default_value = "")]
        credential: String,
        /// none, pem, rsa, dsa or ed25519
        #[arg(long, default_value = "none")]
        key_kind: KeyKind,
    },
    /// Change fields of an existing connection
    Edit {
        name: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        credential: Option<String>,
        /// none, pem, rsa, dsa or ed25519; blank keeps the current kind
        #[arg(long, value_parser = parse_key_kind_change)]
        key_kind: Option<KeyKindChange>,
    },
    /// Delete a connection
    Delete { name: String },
    /// Open an interactive shell on a stored connection
    Connect { name: String },
}

/// `--key-kind` on edit. Wraps `None` for a blank value, which keeps the
/// stored kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyKindChange(Option<KeyKind>);

fn parse_key_kind_change(raw: &str) -> Result<KeyKindChange, UnknownKeyKind> {
    KeyKind::parse_change(raw).map(KeyKindChange)
}

pub fn run_cli(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    init_logging(config.log_level()?);

    let profiles_path = match args.profiles {
        Some(path) => path,
        None => config.profiles_path()?,
    };
    let store = ProfileStore::open(&profiles_path)
        .with_context(|| format!("cannot open profiles at {}", profiles_path.display()))?;
    info!("Using profiles from {:?}", store.path());
    let mut app = App::new(store, &config);

    match args.command {
        None => run_menu(app),
        Some(Command::List) => {
            if app.store.list().is_empty() {
                println!("No connections found.");
            } else {
                print!("{}", connection_table(app.store.list()));
            }
            Ok(())
        }
        Some(Command::Create {
            name,
            address,
            username,
            credential,
            key_kind,
        }) => {
            if !validate_ipv4(&address) {
                bail!("invalid IPv4 address '{address}'");
            }
            app.store
                .create(&name, &address, &username, &credential, key_kind)?;
            println!("New Connection {name} created successfully.");
            Ok(())
        }
        Some(Command::Edit {
            name,
            address,
            username,
            credential,
            key_kind,
        }) => {
            let edit = ProfileEdit {
                address,
                username,
                credential,
                key_kind: key_kind.and_then(|change| change.0),
            };
            report_mutation(&name, "updated", app.store.edit(&name, &edit)?);
            Ok(())
        }
        Some(Command::Delete { name }) => {
            report_mutation(&name, "deleted", app.store.delete(&name)?);
            Ok(())
        }
        Some(Command::Connect { name }) => {
            let Some(profile) = app.store.get(&name).cloned() else {
                bail!("connection '{name}' not found");
            };
            session::countdown(&app, &profile);
            session::run_session(&app, &name, &profile);
            Ok(())
        }
    }
}

fn run_menu(app: App) -> anyhow::Result<()> {
    Menu::new(app, io::stdin().lock(), io::stdout()).show()
}

fn report_mutation(name: &str, verb: &str, outcome: Mutation) {
    match outcome {
        Mutation::Applied => println!("Connection {name} {verb} successfully."),
        Mutation::NotFound => eprintln!("Connection {name} not found."),
    }
}
