use crate::errors::{AppError, AppResult};
use crate::types::outpoint::is_valid_txid;
use crate::types::Outpoint;
use serde::{Deserialize, Serialize};

fn default_max_depth() -> u32 {
    20
}

fn default_circular_detection() -> bool {
    true
}

/// A client's request to trace one output's provenance.
///
/// Validation runs before any Ledger Data Port call; a request that fails
/// it is rejected with a terminal Error event and never touches the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRequest {
    pub txid: String,
    pub vout: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_circular_detection")]
    pub circular_detection: bool,
}

impl TraceRequest {
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self {
            txid: txid.into(),
            vout,
            max_depth: default_max_depth(),
            circular_detection: default_circular_detection(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_circular_detection(mut self, enabled: bool) -> Self {
        self.circular_detection = enabled;
        self
    }

    /// Validate the request shape: 64-hex txid and max depth within 1-100
    pub fn validate(&self) -> AppResult<()> {
        if self.txid.trim().is_empty() {
            return Err(AppError::Validation("TXID is required".to_string()));
        }
        if self.txid.len() != 64 {
            return Err(AppError::Validation(
                "TXID must be exactly 64 characters long".to_string(),
            ));
        }
        if !is_valid_txid(&self.txid) {
            return Err(AppError::Validation(
                "TXID must be a valid hexadecimal string".to_string(),
            ));
        }
        if self.max_depth == 0 || self.max_depth > 100 {
            return Err(AppError::Validation(format!(
                "max_depth must be within 1-100, got {}",
                self.max_depth
            )));
        }
        Ok(())
    }

    /// The trace root outpoint
    pub fn root(&self) -> Outpoint {
        Outpoint::new(self.txid.clone(), self.vout)
    }
}
