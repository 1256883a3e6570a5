//! Ledger Data Port - resolving transactions from a Bitcoin data backend
//!
//! This module provides everything the walker needs to turn a transaction
//! identifier into its full input/output structure:
//! - **LedgerDataPort** - the trait the core is written against
//! - **CoreRpcLedger** - Bitcoin Core JSON-RPC realization (`corepc-client`)
//! - **EsploraLedger** - electrs/esplora HTTP index realization (`reqwest`)
//! - **Cache** - per-handle transaction cache shared by both realizations
//! - **Retry** - fixed-delay bounded retry and blocking-call timeout helpers
//!
//! Both realizations are explicitly constructed resource handles owned by
//! the caller and injected into the walker; neither is reached through
//! ambient state.

pub mod cache;
pub mod core_rpc;
pub mod esplora;
pub mod retry;

use crate::errors::PortResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export main types
pub use cache::{CacheStats, TransactionCache};
pub use core_rpc::CoreRpcLedger;
pub use esplora::EsploraLedger;
pub use retry::{execute_blocking_with_timeout, with_retries};

/// A reference from a transaction input to the output it spends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRef {
    pub txid: String,
    pub vout: u32,
}

/// One output of a resolved transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOutput {
    pub addresses: Vec<String>,
    pub value_sat: u64,
    pub script_type: String,
}

/// A transaction's full input/output structure as the walker consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTransaction {
    pub txid: String,
    pub inputs: Vec<InputRef>,
    pub outputs: Vec<ResolvedOutput>,
    /// Block time, when the backend supplies it
    pub block_time: Option<DateTime<Utc>>,
}

/// The Ledger Data Port consumed by the Backward Trace Walker.
///
/// Implementations own their connection state, classify failures into the
/// [`crate::errors::PortError`] taxonomy, and retry transient failures
/// internally with bounded attempts and a fixed delay. `resolve` is the
/// only blocking operation a trace session performs.
#[async_trait]
pub trait LedgerDataPort: Send + Sync {
    /// Resolve a transaction identifier to its full input/output structure
    async fn resolve(&self, txid: &str) -> PortResult<ResolvedTransaction>;

    /// Cheap connectivity check for startup and the test-backend command
    async fn ping(&self) -> PortResult<()>;
}

/// Map a script to the Bitcoin Core type naming used in step events
pub(crate) fn classify_script(script: &bitcoin::Script) -> &'static str {
    if script.is_p2pkh() {
        "pubkeyhash"
    } else if script.is_p2sh() {
        "scripthash"
    } else if script.is_p2wpkh() {
        "witness_v0_keyhash"
    } else if script.is_p2wsh() {
        "witness_v0_scripthash"
    } else if script.is_p2tr() {
        "witness_v1_taproot"
    } else if script.is_op_return() {
        "nulldata"
    } else {
        "nonstandard"
    }
}
