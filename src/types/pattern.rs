use crate::types::Outpoint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Minimum number of distinct outpoints a reportable cycle must contain
pub const MIN_CYCLE_LENGTH: usize = 3;

/// Classification of a detected circular pattern by cycle length
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    ImmediateReturn,
    ShortCycle,
    MediumCycle,
    LongCycle,
}

impl PatternType {
    /// Length-based classification. The source carried an unreachable
    /// risk-based refinement after its return; only the length rule is
    /// defined behaviour.
    pub fn classify(cycle_length: usize) -> Self {
        if cycle_length <= 3 {
            PatternType::ImmediateReturn
        } else if cycle_length <= 6 {
            PatternType::ShortCycle
        } else if cycle_length <= 10 {
            PatternType::MediumCycle
        } else {
            PatternType::LongCycle
        }
    }
}

/// A detected circular transaction pattern.
///
/// Created once per unique cycle signature per session; immutable after
/// scoring. The `sequence` holds the distinct outpoints of the cycle in
/// path order, without repeating the closing vertex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularPattern {
    /// Deterministic id derived from the ordered outpoint sequence, so the
    /// same cycle reached through different detection strategies collapses
    /// to one identity
    pub id: String,
    pub sequence: Vec<Outpoint>,
    pub cycle_length: usize,
    pub addresses: BTreeSet<String>,
    /// Sum of the cycle outpoints' values, in BTC
    pub total_value: f64,
    pub risk_score: f64,
    pub pattern_type: PatternType,
    pub confidence: f64,
}

impl CircularPattern {
    /// Derive the deterministic cycle id from an ordered outpoint sequence
    pub fn derive_id(sequence: &[Outpoint]) -> String {
        let joined = sequence
            .iter()
            .map(|op| format!("{}:{}", op.txid, op.vout))
            .collect::<Vec<_>>()
            .join("->");
        let digest = Sha256::digest(joined.as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    /// The deduplication signature: the sorted multiset of cycle outpoints
    pub fn signature(sequence: &[Outpoint]) -> Vec<Outpoint> {
        let mut sig = sequence.to_vec();
        sig.sort();
        sig
    }
}
