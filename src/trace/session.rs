use crate::config::TraceConfig;
use crate::errors::{AppError, AppResult};
use crate::ledger::LedgerDataPort;
use crate::trace::{BackwardTraceWalker, CircularPatternDetector, WalkEvent};
use crate::types::{TraceEvent, TraceRequest};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Composition root for one trace request.
///
/// Wires the walker's output into the detector and surfaces the ordered
/// event stream over a bounded channel. The walker and detector run in
/// strict lock-step: the next ledger resolution only happens after the
/// previous step's events have been consumed, which gives the pipeline
/// natural backpressure. A closed channel (the client went away) is the
/// cancellation signal, checked between steps; it stops further ledger
/// calls and the session's graph state drops with it.
pub struct TraceSession {
    port: Arc<dyn LedgerDataPort>,
    config: TraceConfig,
}

impl TraceSession {
    pub fn new(port: Arc<dyn LedgerDataPort>, config: TraceConfig) -> Self {
        Self { port, config }
    }

    /// Run the trace to completion, emitting events in discovery order.
    ///
    /// Exactly one `Complete` or one terminal `Error` is emitted per run;
    /// the error case is also returned to the caller. A cancelled run
    /// (receiver dropped) returns `Ok` without a terminal event, since
    /// nobody is listening.
    pub async fn run(
        &self,
        request: TraceRequest,
        events: mpsc::Sender<TraceEvent>,
    ) -> AppResult<()> {
        if let Err(e) = request.validate() {
            warn!("Rejecting trace request: {}", e);
            let _ = events
                .send(TraceEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return Err(e);
        }

        info!(
            "Starting trace for {}:{} (max_depth: {}, circular_detection: {})",
            request.txid, request.vout, request.max_depth, request.circular_detection
        );
        if !emit(
            &events,
            TraceEvent::Status {
                message: format!("Starting trace for {}:{}", request.txid, request.vout),
            },
        )
        .await
        {
            return Ok(());
        }

        let mut walker = BackwardTraceWalker::new(
            Arc::clone(&self.port),
            request.root(),
            request.max_depth,
            self.config.max_visited,
        );
        let mut detector = request.circular_detection.then(|| {
            CircularPatternDetector::new(
                self.config.max_cycle_length.min(request.max_depth as usize),
            )
        });

        let mut total_steps = 0usize;
        let mut all_addresses: HashSet<String> = HashSet::new();

        loop {
            match walker.next_event().await {
                Ok(None) => break,
                Ok(Some(WalkEvent::Step(step))) => {
                    total_steps += 1;
                    all_addresses.extend(step.addresses.iter().cloned());

                    let mut is_circular = false;
                    let mut circular_risk = 0.0;
                    if let Some(det) = detector.as_mut() {
                        for pattern in det.observe(&step) {
                            if !emit(&events, TraceEvent::CycleFinding { pattern }).await {
                                return Ok(());
                            }
                        }
                        (is_circular, circular_risk) = det.step_risk(&step.outpoint);
                    }

                    let event = TraceEvent::Step {
                        outpoint: step.outpoint,
                        addresses: step.addresses,
                        value: step.value,
                        depth: step.depth,
                        script_type: step.script_type,
                        is_circular,
                        circular_risk,
                    };
                    if !emit(&events, event).await {
                        return Ok(());
                    }
                }
                Ok(Some(WalkEvent::FoldBack { from, to })) => {
                    if let Some(det) = detector.as_mut() {
                        for pattern in det.observe_fold_back(&from, &to) {
                            if !emit(&events, TraceEvent::CycleFinding { pattern }).await {
                                return Ok(());
                            }
                        }
                    }
                }
                Ok(Some(WalkEvent::Cutoff { visited })) => {
                    let message = format!(
                        "Trace stopped after visiting {} outpoints (safety ceiling); results are partial",
                        visited
                    );
                    if !emit(&events, TraceEvent::Status { message }).await {
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("Trace aborted: {}", e);
                    let message = match &e {
                        AppError::Port(port_err) => port_err.user_message(),
                        other => other.to_string(),
                    };
                    let _ = events.send(TraceEvent::Error { message }).await;
                    return Err(e);
                }
            }
        }

        let mut total_cycles = 0;
        if let Some(det) = detector.as_ref() {
            total_cycles = det.detected_cycles().len();
            if !emit(
                &events,
                TraceEvent::AnalysisSummary {
                    report: det.summarize(),
                },
            )
            .await
            {
                return Ok(());
            }
        }

        info!(
            "Trace completed: {} steps, {} addresses, {} cycles",
            total_steps,
            all_addresses.len(),
            total_cycles
        );
        emit(
            &events,
            TraceEvent::Complete {
                total_steps,
                total_addresses: all_addresses.len(),
                total_cycles,
            },
        )
        .await;

        Ok(())
    }
}

/// Send one event; `false` means the receiver is gone and the session
/// should stop doing work
async fn emit(events: &mpsc::Sender<TraceEvent>, event: TraceEvent) -> bool {
    events.send(event).await.is_ok()
}
