use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ConfigLoader};
use crate::storage::SqliteStore;

pub mod commands;

use self::commands::{DeleteArgs, EditArgs, ListArgs, SaveArgs, SettingsArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(
    name = "notesync",
    version,
    about = "Note editor with debounced autosave to a note store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTESYNC_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over NOTESYNC_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Edit notes interactively, one line per input (default)
    Edit(EditArgs),
    /// List stored notes, most recently modified first
    List(ListArgs),
    /// Print a stored note
    Show(ShowArgs),
    /// Save a note in one shot
    Save(SaveArgs),
    /// Delete a stored note
    Delete(DeleteArgs),
    /// Check that the note store is reachable
    Health,
    /// Show or change autosave settings
    Settings(SettingsArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("NOTESYNC_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("NOTESYNC_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Edit(EditArgs::default()));
    dispatch(&loader, config, command)
}

/// Runs one subcommand. Only commands that talk to the store open the database.
fn dispatch(loader: &ConfigLoader, config: AppConfig, command: Commands) -> Result<()> {
    let open_store = |config: &AppConfig| -> Result<Arc<SqliteStore>> {
        let store = SqliteStore::init(&config.storage)?;
        Ok(Arc::new(store))
    };
    match command {
        Commands::Settings(args) => commands::update_settings(loader, config, args),
        Commands::Edit(args) => commands::run_edit(&config, open_store(&config)?, args),
        Commands::List(args) => commands::list_notes(open_store(&config)?.as_ref(), args),
        Commands::Show(args) => commands::show_note(open_store(&config)?.as_ref(), args),
        Commands::Save(args) => commands::save_note(&config, open_store(&config)?, args),
        Commands::Delete(args) => commands::delete_note(open_store(&config)?.as_ref(), args),
        Commands::Health => commands::check_health(open_store(&config)?.as_ref()),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))
    })
    .map(|_| ())
}
