use crate::config::{AppConfig, BackendKind};
use crate::errors::{AppError, AppResult};
use crate::ledger::{CoreRpcLedger, EsploraLedger, LedgerDataPort};
use std::sync::Arc;

pub mod test_backend;
pub mod trace;

/// Construct the configured Ledger Data Port realization.
///
/// The handle is explicitly owned by the command and injected into the
/// session; connection state never lives in globals.
pub(crate) async fn build_port(config: &AppConfig) -> AppResult<Arc<dyn LedgerDataPort>> {
    match config.backend {
        BackendKind::CoreRpc => {
            let ledger = CoreRpcLedger::connect(config.bitcoin_rpc.clone()).await?;
            Ok(Arc::new(ledger))
        }
        BackendKind::Esplora => {
            let ledger = EsploraLedger::new(config.electrs.clone())?;
            Ok(Arc::new(ledger))
        }
    }
}

/// Parse a --backend override
pub(crate) fn parse_backend(value: &str) -> AppResult<BackendKind> {
    match value {
        "core_rpc" | "core-rpc" => Ok(BackendKind::CoreRpc),
        "esplora" | "electrs" => Ok(BackendKind::Esplora),
        other => Err(AppError::Config(format!(
            "Unknown backend '{}', expected core-rpc or esplora",
            other
        ))),
    }
}
