//! Shared test fixtures: a scripted in-memory ledger backend
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use satoshi_tracer::errors::{PortError, PortResult};
use satoshi_tracer::ledger::{InputRef, LedgerDataPort, ResolvedOutput, ResolvedTransaction};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic 64-hex txid from a small tag
pub fn txid(tag: u8) -> String {
    format!("{:02x}", tag).repeat(32)
}

/// A scripted Ledger Data Port for tests: transactions are registered up
/// front, unknown txids resolve to NotFound, and selected txids can be
/// forced to fail transiently. Counts resolve calls so tests can assert
/// the port was (or was not) touched.
pub struct MockLedger {
    transactions: HashMap<String, ResolvedTransaction>,
    transient_failures: HashSet<String>,
    calls: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            transactions: HashMap::new(),
            transient_failures: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Register a transaction: `inputs` as (prev_txid, prev_vout) pairs,
    /// `outputs` as (addresses, value_sat) pairs
    pub fn add_tx(
        &mut self,
        txid: &str,
        inputs: Vec<(String, u32)>,
        outputs: Vec<(Vec<&str>, u64)>,
    ) {
        self.add_tx_at(txid, inputs, outputs, None);
    }

    /// Register a transaction with a block time
    pub fn add_tx_at(
        &mut self,
        txid: &str,
        inputs: Vec<(String, u32)>,
        outputs: Vec<(Vec<&str>, u64)>,
        block_time_secs: Option<i64>,
    ) {
        let tx = ResolvedTransaction {
            txid: txid.to_string(),
            inputs: inputs
                .into_iter()
                .map(|(txid, vout)| InputRef { txid, vout })
                .collect(),
            outputs: outputs
                .into_iter()
                .map(|(addresses, value_sat)| ResolvedOutput {
                    addresses: addresses.into_iter().map(|a| a.to_string()).collect(),
                    value_sat,
                    script_type: "pubkeyhash".to_string(),
                })
                .collect(),
            block_time: block_time_secs.and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        };
        self.transactions.insert(txid.to_string(), tx);
    }

    /// Make every resolution of this txid fail transiently
    pub fn fail_transiently(&mut self, txid: &str) {
        self.transient_failures.insert(txid.to_string());
    }

    /// Number of resolve calls made against this ledger
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerDataPort for MockLedger {
    async fn resolve(&self, txid: &str) -> PortResult<ResolvedTransaction> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.transient_failures.contains(txid) {
            return Err(PortError::Transient("scripted failure".to_string()));
        }

        self.transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| PortError::NotFound {
                txid: txid.to_string(),
            })
    }

    async fn ping(&self) -> PortResult<()> {
        Ok(())
    }
}

/// Build a linear chain of `n` transactions, each output spending the next
/// transaction's output 0, terminating in a newly issued coin. Returns the
/// ledger; the trace root is `(txid(1), 0)`.
pub fn linear_chain(n: u8) -> MockLedger {
    let mut ledger = MockLedger::new();
    for i in 1..=n {
        let addr = format!("1Addr{:03}xxxxxxxxxxxxxxxxxxxxxxxxxx", i);
        let inputs = if i < n {
            vec![(txid(i + 1), 0)]
        } else {
            vec![(satoshi_tracer::types::outpoint::NULL_TXID.to_string(), 0)]
        };
        ledger.add_tx(&txid(i), inputs, vec![(vec![addr.as_str()], 50_000_000)]);
    }
    ledger
}

/// Build a three-transaction loop: 1 spends 2, 2 spends 3, 3 spends 1
pub fn three_cycle() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.add_tx(
        &txid(1),
        vec![(txid(2), 0)],
        vec![(vec!["1CycleAddrAxxxxxxxxxxxxxxxxxxxxxx"], 10_000_000)],
    );
    ledger.add_tx(
        &txid(2),
        vec![(txid(3), 0)],
        vec![(vec!["1CycleAddrBxxxxxxxxxxxxxxxxxxxxxx"], 10_000_000)],
    );
    ledger.add_tx(
        &txid(3),
        vec![(txid(1), 0)],
        vec![(vec!["1CycleAddrCxxxxxxxxxxxxxxxxxxxxxx"], 10_000_000)],
    );
    ledger
}
