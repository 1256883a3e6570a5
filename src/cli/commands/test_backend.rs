use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use clap::Args;
use tracing::{error, info};

/// Test connectivity to the configured ledger backend
#[derive(Args)]
pub struct TestBackendCommand {
    /// Ledger backend override (core-rpc or esplora)
    #[arg(long)]
    pub backend: Option<String>,

    /// Bitcoin RPC URL
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Bitcoin RPC username
    #[arg(long)]
    pub rpc_username: Option<String>,

    /// Bitcoin RPC password
    #[arg(long)]
    pub rpc_password: Option<String>,

    /// Esplora base URL
    #[arg(long)]
    pub esplora_url: Option<String>,

    /// Path to a configuration file
    #[arg(long)]
    pub config: Option<String>,
}

impl TestBackendCommand {
    pub async fn run(&self) -> AppResult<()> {
        info!("=== Testing ledger backend connection ===");

        let mut app_config = match &self.config {
            Some(path) => AppConfig::load_from_file(path)?,
            None => AppConfig::load().unwrap_or_else(|_| AppConfig::get_defaults()),
        };

        // Override with CLI arguments
        if let Some(backend) = &self.backend {
            app_config.backend = super::parse_backend(backend)?;
        }
        if let Some(url) = &self.rpc_url {
            app_config.bitcoin_rpc.url = url.clone();
        }
        if let Some(username) = &self.rpc_username {
            app_config.bitcoin_rpc.username = username.clone();
        }
        if let Some(password) = &self.rpc_password {
            app_config.bitcoin_rpc.password = password.clone();
        }
        if let Some(url) = &self.esplora_url {
            app_config.electrs.base_url = url.clone();
        }

        info!("Testing backend: {:?}", app_config.backend);

        let port = match super::build_port(&app_config).await {
            Ok(port) => port,
            Err(e) => {
                error!("Failed to create backend handle: {}", e);
                println!("Ledger backend connection test FAILED");
                println!("Error: {}", e);
                println!("\nTroubleshooting tips:");
                println!("1. Check that the backend (Bitcoin Core or electrs) is running");
                println!("2. Verify the configured URL is correct");
                println!("3. Ensure RPC credentials are valid");
                println!("4. Check that the RPC server is enabled in bitcoin.conf");
                return Err(e);
            }
        };

        match port.ping().await {
            Ok(()) => {
                println!("Ledger backend connection test PASSED");
                println!("Connection is working correctly!");
                Ok(())
            }
            Err(e) => {
                error!("Backend connection test failed: {}", e);
                println!("Ledger backend connection test FAILED");
                println!("Error: {}", e);
                Err(AppError::Port(e))
            }
        }
    }
}
