//! Binary entry point for outlay.
//!
//! This binary provides the CLI for running the expense service.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use outlay::config::OutlayConfig;
use outlay::http::ExpenseServer;
use outlay::observability::{self, InitOptions};
use outlay::storage::{PostgresExpenseStorage, StorageBackendType, create_storage};
use outlay::{Error, ExpenseService};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Outlay - a small expense record service.
#[derive(Parser)]
#[command(name = "outlay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "OUTLAY_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Port to listen on (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep expenses in memory instead of PostgreSQL.
        #[arg(long)]
        in_memory: bool,
    },

    /// Apply pending schema migrations.
    Migrate,

    /// Show the effective configuration.
    Config,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match OutlayConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    if let Err(e) = observability::init_from_config(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Serve { port, in_memory } => cmd_serve(config, port, in_memory).await,
        Commands::Migrate => cmd_migrate(&config).await,
        Commands::Config => {
            cmd_config(&config);
            Ok(())
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Builds storage and the service, then serves until shutdown.
async fn cmd_serve(
    mut config: OutlayConfig,
    port: Option<u16>,
    in_memory: bool,
) -> Result<(), Error> {
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if in_memory {
        config = config.with_backend(StorageBackendType::Memory);
    }

    let storage = create_storage(&config).await?;
    let service = Arc::new(ExpenseService::new(storage));

    ExpenseServer::new(service, config.port)
        .with_auth_key(config.auth_key.clone())
        .serve()
        .await
}

/// Applies migrations against the configured database.
async fn cmd_migrate(config: &OutlayConfig) -> Result<(), Error> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        Error::InvalidInput("missing required configuration: DATABASE_URL".to_string())
    })?;

    let storage = PostgresExpenseStorage::new(
        url,
        config.storage.table_name.clone(),
        Some(config.storage.pool_max_size),
    )?;
    let before = storage.schema_version().await?;
    let after = storage.migrate().await?;

    println!("Table: {}", storage.table_name());
    println!("Schema version: {before} -> {after}");
    println!(
        "Latest known version: {}",
        PostgresExpenseStorage::latest_schema_version()
    );
    Ok(())
}

/// Prints the effective configuration with secrets redacted.
fn cmd_config(config: &OutlayConfig) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("{config}");
    if let Some(path) = OutlayConfig::default_path() {
        println!();
        println!("Default config file: {}", path.display());
    }
}
