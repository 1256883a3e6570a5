use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical "no previous transaction" sentinel used by coinbase inputs
pub const NULL_TXID: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A specific output of a specific transaction.
///
/// Structural equality; used as the vertex identity in the trace frontier
/// and in every detector graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: String,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self {
            txid: txid.into(),
            vout,
        }
    }

    /// Whether the txid is the all-zero newly-issued-coin sentinel
    pub fn is_null(&self) -> bool {
        self.txid == NULL_TXID
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// Validate that a string is a 64-character hexadecimal transaction ID
pub fn is_valid_txid(txid: &str) -> bool {
    txid.len() == 64 && hex::decode(txid).is_ok()
}
