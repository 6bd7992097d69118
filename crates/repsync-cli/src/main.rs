//! repsync CLI - snapshot backup/restore and sync for a local training log

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::common::resolve_db_path;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_sync_conflicts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "repsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Export {
            output,
            app_version,
        } => run_export(output.as_deref(), app_version.as_deref(), &db_path).await?,
        Commands::Import { input, json } => run_import(&input, json, &db_path).await?,
        Commands::List { kind, json } => run_list(kind, json, &db_path).await?,
        Commands::Sync {
            command: Some(SyncCommands::Conflicts { limit, json }),
            ..
        } => run_sync_conflicts(limit, json, &db_path).await?,
        Commands::Sync {
            foreground,
            device_name,
            command: None,
        } => run_sync(foreground, device_name, &db_path).await?,
        Commands::Status { json } => run_status(json, &db_path).await?,
    }

    Ok(())
}
