//! Backward provenance tracing and circular-pattern detection
//!
//! This module contains the algorithmic core of the tracer:
//! - **Walker** - depth-bounded backward traversal over the spend graph,
//!   producing one provenance step per distinct outpoint
//! - **Detector** - incremental cycle detection over the steps, with three
//!   independent strategies and signature deduplication
//! - **Scoring** - the multi-factor risk model and confidence computation
//! - **Session** - the composition root wiring walker output into the
//!   detector and exposing the ordered event stream
//!
//! One session serves one trace request end-to-end; sessions share no
//! mutable state.

pub mod detector;
pub mod scoring;
pub mod session;
pub mod walker;

// Re-export main types
pub use detector::CircularPatternDetector;
pub use session::TraceSession;
pub use walker::{BackwardTraceWalker, WalkEvent};
