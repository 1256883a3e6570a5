//! Risk scoring and confidence model for circular patterns
//!
//! Eight factors, each normalised to [0,1], combined with fixed weights
//! summing to 1.0 and clamped. The known-service and fresh-address factors
//! are neutral constants until an address-intelligence source is wired in.

use crate::types::{Outpoint, ProvenanceStep, MIN_CYCLE_LENGTH};
use crate::utils::math::{coefficient_of_variation, mean, variance};
use std::collections::{BTreeSet, HashMap};

const WEIGHT_CYCLE_LENGTH: f64 = 0.15;
const WEIGHT_COMPLEXITY: f64 = 0.20;
const WEIGHT_VALUE_CONCENTRATION: f64 = 0.15;
const WEIGHT_TIMING: f64 = 0.10;
const WEIGHT_ADDRESS_DIVERSITY: f64 = 0.15;
const WEIGHT_KNOWN_SERVICES: f64 = 0.10;
const WEIGHT_FRESH_ADDRESSES: f64 = 0.10;
const WEIGHT_EQUAL_SPLITS: f64 = 0.05;

/// Neutral score for factors that need external address intelligence
const NEUTRAL_FACTOR: f64 = 0.5;

/// Adjacent values closer than this (in BTC) count as an equal split
const EQUAL_SPLIT_TOLERANCE: f64 = 0.001;

/// Compute the weighted risk score for a cycle, clamped to [0,1]
pub fn risk_score(
    sequence: &[Outpoint],
    addresses: &BTreeSet<String>,
    metadata: &HashMap<Outpoint, ProvenanceStep>,
) -> f64 {
    let values = sequence_values(sequence, metadata);

    let weighted = score_cycle_length(sequence.len()) * WEIGHT_CYCLE_LENGTH
        + score_complexity(sequence.len(), addresses.len()) * WEIGHT_COMPLEXITY
        + score_value_concentration(&values) * WEIGHT_VALUE_CONCENTRATION
        + score_timing(sequence, metadata) * WEIGHT_TIMING
        + score_address_diversity(addresses) * WEIGHT_ADDRESS_DIVERSITY
        + NEUTRAL_FACTOR * WEIGHT_KNOWN_SERVICES
        + NEUTRAL_FACTOR * WEIGHT_FRESH_ADDRESSES
        + score_equal_splits(&values) * WEIGHT_EQUAL_SPLITS;

    weighted.clamp(0.0, 1.0)
}

/// Confidence in a detection: mean of metadata completeness, address
/// occurrence uniqueness (when any addresses exist), and a fixed base term
/// for a structurally valid cycle.
pub fn confidence(sequence: &[Outpoint], metadata: &HashMap<Outpoint, ProvenanceStep>) -> f64 {
    let mut factors = Vec::new();

    if !sequence.is_empty() {
        let resolved = sequence
            .iter()
            .filter(|op| metadata.contains_key(*op))
            .count();
        factors.push(resolved as f64 / sequence.len() as f64);
    }

    let occurrences: Vec<&String> = sequence
        .iter()
        .filter_map(|op| metadata.get(op))
        .flat_map(|step| step.addresses.iter())
        .collect();
    if !occurrences.is_empty() {
        let unique: BTreeSet<&String> = occurrences.iter().copied().collect();
        factors.push(unique.len() as f64 / occurrences.len() as f64);
    }

    if sequence.len() >= MIN_CYCLE_LENGTH {
        factors.push(0.8);
    }

    mean(&factors)
}

/// Shorter cycles are more suspicious
fn score_cycle_length(cycle_length: usize) -> f64 {
    if cycle_length <= 3 {
        0.9
    } else if cycle_length <= 5 {
        0.7
    } else if cycle_length <= 8 {
        0.5
    } else {
        0.3
    }
}

/// Higher transaction-to-address ratio suggests deliberate mixing
fn score_complexity(transaction_count: usize, address_count: usize) -> f64 {
    if address_count == 0 {
        return 0.0;
    }
    (transaction_count as f64 / address_count as f64 / 3.0).min(1.0)
}

/// Low value variance across the cycle suggests structured movement
fn score_value_concentration(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().sum::<f64>() <= 0.0 {
        return 0.0;
    }
    (1.0 - coefficient_of_variation(values)).max(0.0)
}

/// Regular inter-step intervals suggest automation
fn score_timing(sequence: &[Outpoint], metadata: &HashMap<Outpoint, ProvenanceStep>) -> f64 {
    let timestamps: Vec<f64> = sequence
        .iter()
        .filter_map(|op| metadata.get(op))
        .filter_map(|step| step.timestamp_secs())
        .map(|secs| secs as f64)
        .collect();

    if timestamps.len() < 2 {
        return 0.0;
    }

    let intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    let interval_variance = variance(&intervals);

    if interval_variance < 3600.0 {
        0.8
    } else if interval_variance < 86400.0 {
        0.5
    } else {
        0.2
    }
}

/// More distinct address types in one cycle suggests sophistication
fn score_address_diversity(addresses: &BTreeSet<String>) -> f64 {
    if addresses.is_empty() {
        return 0.0;
    }
    let types: BTreeSet<&'static str> = addresses
        .iter()
        .map(|addr| classify_address_type(addr))
        .collect();
    (types.len() as f64 / 4.0).min(1.0)
}

/// Fraction of adjacent value pairs that are near-equal
fn score_equal_splits(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let equal_pairs = values
        .windows(2)
        .filter(|w| (w[0] - w[1]).abs() < EQUAL_SPLIT_TOLERANCE)
        .count();
    equal_pairs as f64 / (values.len() - 1) as f64
}

/// Classify a Bitcoin address by its prefix
pub fn classify_address_type(address: &str) -> &'static str {
    if address.starts_with("bc1q") {
        "p2wpkh"
    } else if address.starts_with("bc1p") {
        "p2tr"
    } else if address.starts_with('1') {
        "p2pkh"
    } else if address.starts_with('3') {
        "p2sh"
    } else {
        "unknown"
    }
}

fn sequence_values(sequence: &[Outpoint], metadata: &HashMap<Outpoint, ProvenanceStep>) -> Vec<f64> {
    sequence
        .iter()
        .filter_map(|op| metadata.get(op))
        .map(|step| step.value)
        .collect()
}
