use crate::errors::AppResult;
use crate::ledger::LedgerDataPort;
use crate::types::{Outpoint, ProvenanceStep};
use bitcoin::Amount;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the walker surfaces to the session on each pull.
///
/// `FoldBack` marks a branch that re-encountered an already-visited
/// outpoint: the branch terminates without re-resolution, and the closing
/// edge is handed to the detector. `Cutoff` marks the visited-count ceiling,
/// a normal terminal condition rather than an error.
#[derive(Debug, Clone)]
pub enum WalkEvent {
    Step(ProvenanceStep),
    FoldBack { from: Outpoint, to: Outpoint },
    Cutoff { visited: usize },
}

/// Depth-first backward traversal over the chain of spends.
///
/// Owns the traversal frontier, visited set, and depth accounting. The
/// sequence of events is lazy, finite, and non-restartable: each call to
/// [`next_event`](Self::next_event) performs at most one ledger resolution.
/// The visited check guarantees termination; pattern analysis is the
/// detector's job.
pub struct BackwardTraceWalker {
    port: Arc<dyn LedgerDataPort>,
    stack: Vec<(Outpoint, u32)>,
    visited: HashSet<Outpoint>,
    max_depth: u32,
    max_visited: usize,
    last_step: Option<Outpoint>,
    finished: bool,
}

impl BackwardTraceWalker {
    pub fn new(
        port: Arc<dyn LedgerDataPort>,
        root: Outpoint,
        max_depth: u32,
        max_visited: usize,
    ) -> Self {
        Self {
            port,
            stack: vec![(root, 0)],
            visited: HashSet::new(),
            max_depth,
            max_visited,
            last_step: None,
            finished: false,
        }
    }

    /// Number of distinct outpoints visited so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Pull the next walk event, or `None` once the frontier is exhausted.
    ///
    /// Resolution failures abort the walk: the port retries transient
    /// failures internally, and a not-found link makes the whole trace
    /// meaningless.
    pub async fn next_event(&mut self) -> AppResult<Option<WalkEvent>> {
        if self.finished {
            return Ok(None);
        }

        while let Some((outpoint, depth)) = self.stack.pop() {
            if self.visited.contains(&outpoint) {
                // Branch terminates here; surface the closing edge
                match self.last_step.clone() {
                    Some(from) => {
                        return Ok(Some(WalkEvent::FoldBack { from, to: outpoint }));
                    }
                    None => continue,
                }
            }

            if self.visited.len() >= self.max_visited {
                warn!(
                    "Trace visited-count ceiling reached ({}), stopping walk",
                    self.max_visited
                );
                self.finished = true;
                return Ok(Some(WalkEvent::Cutoff {
                    visited: self.visited.len(),
                }));
            }

            self.visited.insert(outpoint.clone());
            debug!("Processing {} (depth: {})", outpoint, depth);

            let resolved = match self.port.resolve(&outpoint.txid).await {
                Ok(tx) => tx,
                Err(e) => {
                    self.finished = true;
                    return Err(e.into());
                }
            };

            let Some(output) = resolved.outputs.get(outpoint.vout as usize) else {
                warn!(
                    "Invalid vout index {} for transaction {}, skipping",
                    outpoint.vout, outpoint.txid
                );
                continue;
            };

            let step = ProvenanceStep {
                outpoint: outpoint.clone(),
                addresses: output.addresses.iter().cloned().collect(),
                value: Amount::from_sat(output.value_sat).to_btc(),
                depth,
                script_type: output.script_type.clone(),
                timestamp: resolved.block_time,
            };

            // Queue the previous transactions (inputs), skipping newly
            // issued coins and branches beyond the depth bound
            for input in &resolved.inputs {
                let prev = Outpoint::new(input.txid.clone(), input.vout);
                if prev.is_null() {
                    continue;
                }
                if depth + 1 > self.max_depth {
                    debug!("Depth bound reached, pruning branch at {}", prev);
                    continue;
                }
                self.stack.push((prev, depth + 1));
            }

            self.last_step = Some(outpoint);
            return Ok(Some(WalkEvent::Step(step)));
        }

        self.finished = true;
        Ok(None)
    }
}
