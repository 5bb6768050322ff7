//! tablegate CLI - REST gateway over a Postgres database
//!
//! - `serve`: run the HTTP API
//! - `health`: probe the database once
//! - `tables`: list tables or describe one
//! - `blobs`: inspect the blob stores

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "tablegate",
    author,
    version,
    about = "Generic REST gateway over a Postgres database",
    long_about = "Expose every table in a Postgres database over a small JSON API: \
                  schema introspection, paged reads, row CRUD by id, and raw SQL."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Check database connectivity and print the health report
    Health(commands::health::HealthArgs),
    /// List tables, or show one table's columns
    Tables(commands::tables::TablesArgs),
    /// Inspect blob stores and manage build data
    Blobs(commands::blobs::BlobsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Health(args) => commands::run_health(args).await?,
        Commands::Tables(args) => commands::run_tables(args).await?,
        Commands::Blobs(args) => commands::run_blobs(args).await?,
    }

    Ok(())
}
