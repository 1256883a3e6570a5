use crate::types::Outpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One resolved outpoint encountered while walking backward from the trace
/// root. Produced exactly once per distinct outpoint within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceStep {
    pub outpoint: Outpoint,
    /// Addresses carried by the output script (may be empty for OP_RETURN,
    /// bare multisig, nonstandard scripts)
    pub addresses: BTreeSet<String>,
    /// Output value in BTC
    pub value: f64,
    /// Distance from the trace root
    pub depth: u32,
    pub script_type: String,
    /// Block time of the containing transaction, when the backend supplies it
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProvenanceStep {
    /// Unix timestamp in seconds, for interval statistics
    pub fn timestamp_secs(&self) -> Option<i64> {
        self.timestamp.map(|t| t.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn step(vout: u32) -> ProvenanceStep {
        ProvenanceStep {
            outpoint: Outpoint::new("cd".repeat(32), vout),
            addresses: BTreeSet::from(["1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_string()]),
            value: 0.5,
            depth: 2,
            script_type: "pubkeyhash".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).single(),
        }
    }

    #[test]
    fn test_timestamp_secs() {
        assert_eq!(step(0).timestamp_secs(), Some(1_700_000_000));

        let mut untimed = step(1);
        untimed.timestamp = None;
        assert_eq!(untimed.timestamp_secs(), None);
    }

    #[test]
    fn test_serialises_with_outpoint_fields() {
        let json = serde_json::to_value(step(0)).unwrap();
        assert_eq!(json["outpoint"]["vout"], 0);
        assert_eq!(json["depth"], 2);
        assert_eq!(json["script_type"], "pubkeyhash");
    }
}
