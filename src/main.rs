use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use keyhaven::{
    Config, DuplicateRule, KeyDraft, KeyPatch, KeyRecord, Storage, Vault, parse_import, scan_dir,
    scan_default_dirs,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod auth;

const CLIPBOARD_TTL_SECS: u64 = 15;

#[derive(Debug, Parser)]
#[command(name = "keyhaven")]
#[command(
    version,
    about = "Simple, offline SSH key manager with an encrypted local store."
)]
struct Cli {
    /// Path to the encrypted key store file
    #[arg(long, global = true, value_name = "PATH", env = "KEYHAVEN_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stores a new key
    #[command(arg_required_else_help = true)]
    Add {
        /// Display name for the key
        #[arg(long)]
        name: String,

        /// Optional free-text tag
        #[arg(long)]
        tag: Option<String>,

        /// Read the key material from a file
        #[arg(long, value_name = "PATH", conflicts_with = "material")]
        file: Option<PathBuf>,

        /// Key material given inline
        #[arg(long)]
        material: Option<String>,
    },

    /// Lists stored keys
    List {
        /// Print ids, types, tags and modification times
        #[arg(short, long, default_value_t = false)]
        long: bool,
    },

    /// Prints the material of one key
    #[command(arg_required_else_help = true)]
    Show {
        /// Key id or name
        key: String,

        /// Copy to the clipboard instead of printing
        #[arg(long, default_value_t = false)]
        copy: bool,
    },

    /// Updates name, tag or material of an existing key
    #[command(arg_required_else_help = true)]
    Edit {
        /// Key id or name
        key: String,

        /// New display name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        /// New tag
        #[arg(long, conflicts_with = "clear_tag")]
        tag: Option<String>,

        /// Remove the tag
        #[arg(long, default_value_t = false)]
        clear_tag: bool,

        /// Read new key material from a file
        #[arg(long, value_name = "PATH", conflicts_with = "material")]
        file: Option<PathBuf>,

        /// New key material given inline
        #[arg(long)]
        material: Option<String>,
    },

    /// Removes a key
    #[command(arg_required_else_help = true)]
    Remove {
        /// Key id or name
        key: String,
    },

    /// Imports keys from an export file, skipping duplicates
    #[command(arg_required_else_help = true)]
    Import {
        /// File to import
        file: PathBuf,

        /// The file is encrypted with a transfer password
        #[arg(long, default_value_t = false)]
        encrypted: bool,
    },

    /// Exports keys to a file
    #[command(arg_required_else_help = true)]
    Export {
        /// File to write
        file: PathBuf,

        /// Export only these key ids (default: all)
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<Uuid>,

        /// Encrypt the export with a transfer password
        #[arg(long, default_value_t = false)]
        encrypt: bool,
    },

    /// Scans a directory for SSH keys
    Scan {
        /// Directory to scan (default: ~/.ssh)
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,

        /// Import the found keys instead of listing them
        #[arg(long, default_value_t = false)]
        import: bool,
    },

    /// Sets or clears the vault password, re-encrypting the store
    Passwd {
        /// Go back to the machine-derived key
        #[arg(long, default_value_t = false)]
        clear: bool,
    },

    /// Shows or changes the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Prints the effective configuration
    Show,

    /// Sets a custom store file path
    SetPath { path: PathBuf },

    /// Resets path and password configuration to defaults
    Reset,
}

fn open_vault(store_override: Option<PathBuf>, config: &Config) -> Result<Vault> {
    match store_override {
        Some(path) => Ok(Vault::with_storage(
            Storage::new(path),
            config.stored_password(),
        )),
        None => Ok(Vault::open(config)?),
    }
}

/// Resolves a CLI key argument: a uuid, or a display name.
fn resolve_key(vault: &mut Vault, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }
    match vault.load()?.find_by_name(key) {
        Some(record) => Ok(record.id),
        None => bail!("no key named '{key}'"),
    }
}

fn read_material(file: Option<PathBuf>, inline: Option<String>) -> Result<Option<String>> {
    match (file, inline) {
        (Some(path), None) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read key file '{}'", path.display()))?;
            Ok(Some(text))
        }
        (None, inline) => Ok(inline),
        (Some(_), Some(_)) => unreachable!("clap rejects this combination"),
    }
}

fn copy_to_clipboard(material: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("cannot access clipboard")?;
    clipboard.set_text(material.to_string())?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    println!("copied to clipboard, clearing in {CLIPBOARD_TTL_SECS}s (Ctrl-C clears now)");
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(CLIPBOARD_TTL_SECS);
    while std::time::Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    let _ = clipboard.clear();
    Ok(())
}

fn print_long_listing(records: &[&KeyRecord]) {
    let name_width = records
        .iter()
        .map(|r| r.name.len())
        .chain(std::iter::once("Name".len()))
        .max()
        .unwrap_or(4);
    let type_width = "Ed25519".len();

    println!(
        "{:<36}  {:<name_width$}  {:<type_width$}  {:<10}  Modified",
        "Id", "Name", "Type", "Tag"
    );
    for record in records {
        println!(
            "{:<36}  {:<name_width$}  {:<type_width$}  {:<10}  {}",
            record.id,
            record.name,
            record.key_type.to_string(),
            record.tag.as_deref().unwrap_or("-"),
            record.last_modified.format("%Y-%m-%d %H:%M"),
        );
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let mut config = Config::load()?;

    match args.command {
        Commands::Add {
            name,
            tag,
            file,
            material,
        } => {
            let Some(material) = read_material(file, material)? else {
                bail!("one of --file or --material is required");
            };
            let mut vault = open_vault(args.store, &config)?;
            let record = vault.add(KeyDraft {
                name,
                tag,
                material,
            })?;
            println!("stored key '{}' ({})", record.name, record.key_type);
            println!("{}", record.id);
        }

        Commands::List { long } => {
            let mut vault = open_vault(args.store, &config)?;
            let collection = vault.load()?;
            if collection.is_empty() {
                println!("No keys stored.");
            } else if long {
                print_long_listing(&collection.iter().collect::<Vec<_>>());
            } else {
                for record in collection.iter() {
                    println!("{}", record.name);
                }
            }
        }

        Commands::Show { key, copy } => {
            let mut vault = open_vault(args.store, &config)?;
            let id = resolve_key(&mut vault, &key)?;
            let record = vault
                .load()?
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("no key with id '{id}' in the vault"))?
                .clone();
            if copy {
                copy_to_clipboard(&record.material)?;
            } else {
                println!("{}", record.material);
            }
        }

        Commands::Edit {
            key,
            name,
            tag,
            clear_tag,
            file,
            material,
        } => {
            let material = read_material(file, material)?;
            let patch = KeyPatch {
                name,
                tag: if clear_tag {
                    Some(None)
                } else {
                    tag.map(Some)
                },
                material,
            };
            if patch.is_empty() {
                bail!("nothing to edit; pass --name, --tag, --clear-tag, --file or --material");
            }
            let mut vault = open_vault(args.store, &config)?;
            let id = resolve_key(&mut vault, &key)?;
            let record = vault.edit(id, patch)?;
            println!("key '{}' updated", record.name);
        }

        Commands::Remove { key } => {
            let mut vault = open_vault(args.store, &config)?;
            let id = resolve_key(&mut vault, &key)?;
            vault.remove(id)?;
            println!("key removed");
        }

        Commands::Import { file, encrypted } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read import file '{}'", file.display()))?;
            let password = if encrypted {
                Some(auth::read_transfer_password()?)
            } else {
                None
            };
            let candidates = parse_import(&text, password.as_deref().map(String::as_str))?;

            let mut vault = open_vault(args.store, &config)?;
            let outcome = vault.import(candidates, DuplicateRule::default())?;
            println!(
                "imported {} key(s), skipped {} duplicate(s)",
                outcome.imported, outcome.duplicates
            );
        }

        Commands::Export { file, ids, encrypt } => {
            let password = if encrypt {
                Some(auth::read_transfer_password()?)
            } else {
                None
            };

            let mut vault = open_vault(args.store, &config)?;
            let ids = if ids.is_empty() { None } else { Some(ids) };
            let document = vault.export(ids.as_deref())?;
            let rendered = document.render(password.as_deref().map(String::as_str))?;
            std::fs::write(&file, rendered)
                .with_context(|| format!("cannot write export file '{}'", file.display()))?;
            println!("exported {} key(s) to '{}'", document.total_keys, file.display());
        }

        Commands::Scan { dir, import } => {
            let hits = match dir {
                Some(dir) => scan_dir(&dir)?,
                None => scan_default_dirs()?,
            };
            if hits.is_empty() {
                println!("No keys found.");
            } else if import {
                let candidates = hits.into_iter().map(KeyDraft::from).collect();
                let mut vault = open_vault(args.store, &config)?;
                let outcome = vault.import(candidates, DuplicateRule::default())?;
                println!(
                    "imported {} key(s), skipped {} duplicate(s)",
                    outcome.imported, outcome.duplicates
                );
            } else {
                for hit in hits {
                    println!("{}  [{}]  {}", hit.name, hit.key_type, hit.path.display());
                }
            }
        }

        Commands::Passwd { clear } => {
            let mut vault = open_vault(args.store, &config)?;
            if clear {
                vault.rekey(None)?;
                config.set_password(None);
                config.save()?;
                println!("vault re-encrypted with the machine-derived key");
            } else {
                let password = auth::read_new_password()?;
                vault.rekey(Some(&password))?;
                config.set_password(Some(password.to_string()));
                config.save()?;
                println!("vault password updated");
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("store path: {}", config.store_path()?.display());
                println!(
                    "password: {}",
                    if config.stored_password().is_some() {
                        "set"
                    } else {
                        "not set (machine-derived key)"
                    }
                );
            }
            ConfigCommands::SetPath { path } => {
                config.set_store_path(Some(path.clone()));
                config.save()?;
                println!("store path set to '{}'", path.display());
            }
            ConfigCommands::Reset => {
                config.reset();
                config.save()?;
                println!("configuration reset to defaults");
            }
        },
    }

    Ok(())
}
