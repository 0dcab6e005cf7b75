use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;

use commands::{
    AddCommand, ConfigCommand, GetCommand, ImportCommand, ListCommand, RemoveCommand, SetCommand,
    WatchCommand,
};
use config::Config;
use docket_core::{FileBackend, FileBufferStore, Store};

#[derive(Parser)]
#[command(name = "docket")]
#[command(version)]
#[command(about = "A document store client with write coalescing", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a document under a generated id
    Add(AddCommand),

    /// Fetch a document
    Get(GetCommand),

    /// Write a document immediately
    Set(SetCommand),

    /// Delete a document
    Rm(RemoveCommand),

    /// List the documents in a collection
    Ls(ListCommand),

    /// Stream realtime updates for a document
    Watch(WatchCommand),

    /// Bulk-import JSON Lines through the buffered write path
    Import(ImportCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    // Constructing the store touches no disk; directories are created on
    // the first write.
    let store = build_store(&config);

    match &cli.command {
        Commands::Add(cmd) => cmd.run(&store).await,
        Commands::Get(cmd) => cmd.run(&store).await,
        Commands::Set(cmd) => cmd.run(&store).await,
        Commands::Rm(cmd) => cmd.run(&store).await,
        Commands::Ls(cmd) => cmd.run(&store).await,
        Commands::Watch(cmd) => cmd.run(&store).await,
        Commands::Import(cmd) => cmd.run(&store).await,
        Commands::Config(cmd) => cmd.run(&config),
    }
}

fn build_store(config: &Config) -> Store {
    let backend = Arc::new(FileBackend::new(config.data_dir.value.clone()));
    let buffer = Arc::new(FileBufferStore::new(config.spool_dir.value.clone()));

    Store::new(backend, buffer, config.delays.to_debounce_config())
}
