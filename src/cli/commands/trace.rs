use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::trace::TraceSession;
use crate::types::{TraceEvent, TraceRequest};
use clap::Args;
use tokio::sync::mpsc;
use tracing::error;

/// Trace an output's provenance backwards and report circular patterns
#[derive(Args)]
pub struct TraceCommand {
    /// Transaction ID of the output to trace (64 hex characters)
    #[arg(long)]
    pub txid: String,

    /// Output index within the transaction
    #[arg(long)]
    pub vout: u32,

    /// Maximum trace depth (1-100, defaults to the configured value)
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Disable circular pattern detection
    #[arg(long)]
    pub no_circular_detection: bool,

    /// Ledger backend override (core-rpc or esplora)
    #[arg(long)]
    pub backend: Option<String>,

    /// Path to a configuration file
    #[arg(long)]
    pub config: Option<String>,
}

impl TraceCommand {
    pub async fn run(&self) -> AppResult<()> {
        let mut app_config = match &self.config {
            Some(path) => AppConfig::load_from_file(path)?,
            None => AppConfig::load().unwrap_or_else(|_| AppConfig::get_defaults()),
        };
        if let Some(backend) = &self.backend {
            app_config.backend = super::parse_backend(backend)?;
        }

        let request = TraceRequest::new(self.txid.clone(), self.vout)
            .with_max_depth(self.max_depth.unwrap_or(app_config.trace.default_max_depth))
            .with_circular_detection(!self.no_circular_detection);

        // Validate before touching the backend so a malformed request
        // never opens a connection
        request.validate()?;

        let port = super::build_port(&app_config).await?;
        let session = TraceSession::new(port, app_config.trace.clone());

        let (events_tx, mut events_rx) = mpsc::channel::<TraceEvent>(16);

        let printer = async {
            while let Some(event) = events_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Failed to serialise event: {}", e),
                }
            }
        };

        let (result, ()) = tokio::join!(session.run(request, events_tx), printer);
        result
    }
}
