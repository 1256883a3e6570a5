use crate::trace::scoring;
use crate::types::{
    AnalysisReport, CircularPattern, Outpoint, PatternType, ProvenanceStep, MIN_CYCLE_LENGTH,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Incremental circular-pattern detection over a stream of provenance steps.
///
/// Maintains a directed adjacency graph of outpoints (the walker's traversal
/// order read as provenance edges), an address index, and per-outpoint
/// metadata. Each observed step triggers three independent detection
/// strategies; candidates are deduplicated by their sorted-outpoint
/// signature so the same cycle found twice is reported once.
///
/// Owned by exactly one trace session; grows monotonically for its lifetime.
pub struct CircularPatternDetector {
    max_cycle_length: usize,
    graph: HashMap<Outpoint, Vec<Outpoint>>,
    reverse_graph: HashMap<Outpoint, Vec<Outpoint>>,
    address_index: HashMap<String, BTreeSet<Outpoint>>,
    metadata: HashMap<Outpoint, ProvenanceStep>,
    detected: Vec<CircularPattern>,
    seen_signatures: HashSet<Vec<Outpoint>>,
    last_observed: Option<Outpoint>,
}

impl CircularPatternDetector {
    pub fn new(max_cycle_length: usize) -> Self {
        Self {
            max_cycle_length,
            graph: HashMap::new(),
            reverse_graph: HashMap::new(),
            address_index: HashMap::new(),
            metadata: HashMap::new(),
            detected: Vec::new(),
            seen_signatures: HashSet::new(),
            last_observed: None,
        }
    }

    /// Consume one provenance step and return any newly confirmed patterns
    pub fn observe(&mut self, step: &ProvenanceStep) -> Vec<CircularPattern> {
        let key = step.outpoint.clone();

        self.metadata.insert(key.clone(), step.clone());
        for addr in &step.addresses {
            self.address_index
                .entry(addr.clone())
                .or_default()
                .insert(key.clone());
        }

        if let Some(prev) = self.last_observed.clone() {
            self.add_link(prev, key.clone());
        }
        self.last_observed = Some(key.clone());

        self.detect_from(&key)
    }

    /// Record the closing edge of a branch that folded back onto an
    /// already-visited outpoint, and rerun detection from that outpoint.
    pub fn observe_fold_back(&mut self, from: &Outpoint, to: &Outpoint) -> Vec<CircularPattern> {
        self.add_link(from.clone(), to.clone());
        self.detect_from(to)
    }

    /// All patterns detected so far, in emission order
    pub fn detected_cycles(&self) -> &[CircularPattern] {
        &self.detected
    }

    /// Whether an outpoint participates in any detected cycle, and the risk
    /// of the first cycle containing it
    pub fn step_risk(&self, outpoint: &Outpoint) -> (bool, f64) {
        for cycle in &self.detected {
            if cycle.sequence.contains(outpoint) {
                return (true, cycle.risk_score);
            }
        }
        (false, 0.0)
    }

    /// Cycles at or above a risk threshold
    pub fn cycles_by_risk(&self, min_risk: f64) -> Vec<&CircularPattern> {
        self.detected
            .iter()
            .filter(|c| c.risk_score >= min_risk)
            .collect()
    }

    /// Cycles of a specific pattern type
    pub fn cycles_by_pattern_type(&self, pattern_type: PatternType) -> Vec<&CircularPattern> {
        self.detected
            .iter()
            .filter(|c| c.pattern_type == pattern_type)
            .collect()
    }

    /// Aggregate view over everything detected in this session
    pub fn summarize(&self) -> AnalysisReport {
        if self.detected.is_empty() {
            return AnalysisReport::empty();
        }

        let high_risk = self.cycles_by_risk(0.7).len();
        let average = self.detected.iter().map(|c| c.risk_score).sum::<f64>()
            / self.detected.len() as f64;
        let pattern_types = self.detected.iter().map(|c| c.pattern_type).collect();
        let total_value = self.detected.iter().map(|c| c.total_value).sum();

        AnalysisReport {
            total_cycles: self.detected.len(),
            high_risk_cycles: high_risk,
            average_risk_score: average,
            pattern_types,
            total_circular_value: total_value,
            analysis_summary: format!(
                "Detected {} circular patterns with {} high-risk cases",
                self.detected.len(),
                high_risk
            ),
            cycles: self.detected.clone(),
        }
    }

    fn add_link(&mut self, from: Outpoint, to: Outpoint) {
        let forward = self.graph.entry(from.clone()).or_default();
        if !forward.contains(&to) {
            forward.push(to.clone());
            self.reverse_graph.entry(to).or_default().push(from);
        }
    }

    /// Run all three strategies from one outpoint and admit survivors
    fn detect_from(&mut self, key: &Outpoint) -> Vec<CircularPattern> {
        let mut candidates = Vec::new();
        candidates.extend(self.address_recurrence_candidates(key));
        candidates.extend(self.path_revisit_candidates(key));
        candidates.extend(self.component_candidates(key));

        let mut emitted = Vec::new();
        for candidate in candidates {
            if let Some(pattern) = self.admit(candidate) {
                emitted.push(pattern);
            }
        }
        emitted
    }

    /// Strategy 1: an address seen earlier in the trace reappears on the
    /// current outpoint; any forward path from the earlier outpoint back to
    /// this one closes a fold keyed by that address.
    fn address_recurrence_candidates(&self, key: &Outpoint) -> Vec<Vec<Outpoint>> {
        let Some(step) = self.metadata.get(key) else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for addr in &step.addresses {
            let Some(sharing) = self.address_index.get(addr) else {
                continue;
            };
            if sharing.len() < 2 {
                continue;
            }
            for other in sharing {
                if other == key {
                    continue;
                }
                if let Some(path) = self.find_path(other, key) {
                    debug!(
                        "Address {} recurs along a {}-hop path back to {}",
                        addr,
                        path.len(),
                        key
                    );
                    candidates.push(path);
                }
            }
        }
        candidates
    }

    /// Strategy 2: depth-first exploration of forward edges with an
    /// explicit `(node, path)` stack; a node already on its own path closes
    /// a cycle candidate.
    fn path_revisit_candidates(&self, key: &Outpoint) -> Vec<Vec<Outpoint>> {
        let mut candidates = Vec::new();
        let mut stack: Vec<(Outpoint, Vec<Outpoint>)> = vec![(key.clone(), Vec::new())];

        while let Some((node, path)) = stack.pop() {
            if path.len() > self.max_cycle_length {
                continue;
            }
            if let Some(pos) = path.iter().position(|n| n == &node) {
                let cycle = path[pos..].to_vec();
                if cycle.len() > 2 {
                    candidates.push(cycle);
                }
                continue;
            }

            let mut next_path = path;
            next_path.push(node.clone());
            for succ in self.graph.get(&node).into_iter().flatten() {
                stack.push((succ.clone(), next_path.clone()));
            }
        }
        candidates
    }

    /// Strategy 3: collect the bounded forward-reachable component; enough
    /// internal edges relative to node count is a cheap cyclicity proxy.
    /// A true strongly-connected-components pass would be a design upgrade,
    /// not a fix.
    fn component_candidates(&self, key: &Outpoint) -> Vec<Vec<Outpoint>> {
        let mut component = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![key.clone()];

        while let Some(node) = stack.pop() {
            if visited.contains(&node) || component.len() >= self.max_cycle_length {
                continue;
            }
            visited.insert(node.clone());
            component.push(node.clone());
            for succ in self.graph.get(&node).into_iter().flatten() {
                if !visited.contains(succ) {
                    stack.push(succ.clone());
                }
            }
        }

        if component.len() <= 2 {
            return Vec::new();
        }

        let members: HashSet<&Outpoint> = component.iter().collect();
        let internal_edges = component
            .iter()
            .flat_map(|node| self.graph.get(node).into_iter().flatten())
            .filter(|succ| members.contains(succ))
            .count();

        if internal_edges >= component.len() {
            vec![component]
        } else {
            Vec::new()
        }
    }

    /// Breadth-first path search over forward edges, bounded by the maximum
    /// cycle length in hops
    fn find_path(&self, start: &Outpoint, end: &Outpoint) -> Option<Vec<Outpoint>> {
        if start == end {
            return Some(vec![start.clone()]);
        }

        let mut queue: VecDeque<(Outpoint, Vec<Outpoint>)> =
            VecDeque::from([(start.clone(), vec![start.clone()])]);
        let mut visited: HashSet<Outpoint> = HashSet::from([start.clone()]);

        while let Some((node, path)) = queue.pop_front() {
            if path.len() > self.max_cycle_length {
                continue;
            }
            for succ in self.graph.get(&node).into_iter().flatten() {
                if succ == end {
                    let mut found = path;
                    found.push(succ.clone());
                    return Some(found);
                }
                if visited.insert(succ.clone()) {
                    let mut next = path.clone();
                    next.push(succ.clone());
                    queue.push_back((succ.clone(), next));
                }
            }
        }
        None
    }

    /// Validate a candidate sequence, deduplicate by signature, then build
    /// and score the pattern
    fn admit(&mut self, sequence: Vec<Outpoint>) -> Option<CircularPattern> {
        if sequence.len() < MIN_CYCLE_LENGTH || sequence.len() > self.max_cycle_length {
            return None;
        }

        let signature = CircularPattern::signature(&sequence);
        if !self.seen_signatures.insert(signature) {
            return None;
        }

        let addresses: BTreeSet<String> = sequence
            .iter()
            .filter_map(|op| self.metadata.get(op))
            .flat_map(|step| step.addresses.iter().cloned())
            .collect();
        let total_value: f64 = sequence
            .iter()
            .filter_map(|op| self.metadata.get(op))
            .map(|step| step.value)
            .sum();

        let risk_score = scoring::risk_score(&sequence, &addresses, &self.metadata);
        let confidence = scoring::confidence(&sequence, &self.metadata);

        let pattern = CircularPattern {
            id: CircularPattern::derive_id(&sequence),
            cycle_length: sequence.len(),
            pattern_type: PatternType::classify(sequence.len()),
            sequence,
            addresses,
            total_value,
            risk_score,
            confidence,
        };

        debug!(
            "Admitted cycle {} (length {}, risk {:.3})",
            pattern.id, pattern.cycle_length, pattern.risk_score
        );
        self.detected.push(pattern.clone());
        Some(pattern)
    }
}
