use crate::types::{CircularPattern, Outpoint, PatternType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Session event stream exposed to the transport layer.
///
/// A closed, tagged variant set: consumers match on `type` and never see a
/// free-form map. Ordering contract: zero or more Status/Step/CycleFinding
/// events in discovery order, then AnalysisSummary (when detection ran),
/// then exactly one Complete - or one terminal Error instead, after which
/// nothing follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Status {
        message: String,
    },
    Step {
        outpoint: Outpoint,
        addresses: BTreeSet<String>,
        value: f64,
        depth: u32,
        script_type: String,
        is_circular: bool,
        circular_risk: f64,
    },
    CycleFinding {
        #[serde(flatten)]
        pattern: CircularPattern,
    },
    AnalysisSummary {
        #[serde(flatten)]
        report: AnalysisReport,
    },
    Error {
        message: String,
    },
    Complete {
        total_steps: usize,
        total_addresses: usize,
        total_cycles: usize,
    },
}

impl TraceEvent {
    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceEvent::Complete { .. } | TraceEvent::Error { .. })
    }
}

/// Aggregate view over all cycles found in one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub total_cycles: usize,
    /// Cycles with risk_score >= 0.7
    pub high_risk_cycles: usize,
    pub average_risk_score: f64,
    pub pattern_types: BTreeSet<PatternType>,
    pub total_circular_value: f64,
    pub analysis_summary: String,
    pub cycles: Vec<CircularPattern>,
}

impl AnalysisReport {
    /// The report for a session in which nothing was detected
    pub fn empty() -> Self {
        Self {
            total_cycles: 0,
            high_risk_cycles: 0,
            average_risk_score: 0.0,
            pattern_types: BTreeSet::new(),
            total_circular_value: 0.0,
            analysis_summary: "No circular patterns detected".to_string(),
            cycles: Vec::new(),
        }
    }
}
