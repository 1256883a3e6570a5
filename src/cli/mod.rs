use crate::errors::AppResult;
use clap::{Parser, Subcommand};
use tracing_subscriber;

pub mod commands;

/// Bitcoin UTXO Provenance Tracer
#[derive(Parser)]
#[command(name = "satoshi-tracer")]
#[command(about = "Bitcoin UTXO Provenance Tracer")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trace an output's provenance backwards and report circular patterns
    Trace(commands::trace::TraceCommand),
    /// Test connectivity to the configured ledger backend
    TestBackend(commands::test_backend::TestBackendCommand),
}

pub async fn run() -> AppResult<()> {
    // Initialise tracing subscriber to capture info!() macros
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trace(command) => command.run().await,
        Commands::TestBackend(command) => command.run().await,
    }
}
