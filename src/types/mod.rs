//! Core data model for provenance tracing
//!
//! This module contains the vertex identity type ([`Outpoint`]), the
//! per-visit record emitted by the walker ([`ProvenanceStep`]), the scored
//! cycle findings ([`CircularPattern`]), the validated trace request, and
//! the closed session event stream ([`TraceEvent`]).

pub mod events;
pub mod outpoint;
pub mod pattern;
pub mod request;
pub mod step;

// Re-export main types
pub use events::{AnalysisReport, TraceEvent};
pub use outpoint::Outpoint;
pub use pattern::{CircularPattern, PatternType, MIN_CYCLE_LENGTH};
pub use request::TraceRequest;
pub use step::ProvenanceStep;
