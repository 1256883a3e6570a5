//! Detector behaviour observed through full sessions: address recurrence,
//! step enrichment, scoring inputs, and error surfacing

mod common;

use anyhow::Result;
use common::{txid, MockLedger};
use satoshi_tracer::config::TraceConfig;
use satoshi_tracer::errors::AppError;
use satoshi_tracer::trace::TraceSession;
use satoshi_tracer::types::{PatternType, TraceEvent, TraceRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

async fn run_session(
    ledger: MockLedger,
    request: TraceRequest,
) -> (Vec<TraceEvent>, Result<(), AppError>) {
    let session = TraceSession::new(Arc::new(ledger), TraceConfig::default());
    let (tx, mut rx) = mpsc::channel(16);

    let collector = async {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    };
    let (result, events) = tokio::join!(session.run(request, tx), collector);
    (events, result)
}

/// Acyclic spend chain whose first and last outputs share an address
fn shared_address_chain() -> MockLedger {
    let shared = "1SharedReuseAddrxxxxxxxxxxxxxxxxx";
    let mut ledger = MockLedger::new();
    ledger.add_tx_at(
        &txid(1),
        vec![(txid(2), 0)],
        vec![(vec![shared], 20_000_000)],
        Some(1_700_003_600),
    );
    ledger.add_tx_at(
        &txid(2),
        vec![(txid(3), 0)],
        vec![(vec!["1MiddleAddrxxxxxxxxxxxxxxxxxxxxxx"], 20_000_000)],
        Some(1_700_001_800),
    );
    ledger.add_tx_at(
        &txid(3),
        vec![(
            satoshi_tracer::types::outpoint::NULL_TXID.to_string(),
            0,
        )],
        vec![(vec![shared], 20_000_000)],
        Some(1_700_000_000),
    );
    ledger
}

#[tokio::test]
async fn address_recurrence_is_detected_on_an_acyclic_chain() -> Result<()> {
    let (events, result) =
        run_session(shared_address_chain(), TraceRequest::new(txid(1), 0)).await;
    result?;

    let findings: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TraceEvent::CycleFinding { pattern } => Some(pattern),
            _ => None,
        })
        .collect();
    assert_eq!(findings.len(), 1);

    let pattern = findings[0];
    assert_eq!(pattern.cycle_length, 3);
    assert_eq!(pattern.pattern_type, PatternType::ImmediateReturn);
    assert!(pattern.addresses.contains("1SharedReuseAddrxxxxxxxxxxxxxxxxx"));
    assert!((0.0..=1.0).contains(&pattern.risk_score));
    assert!((0.0..=1.0).contains(&pattern.confidence));
    Ok(())
}

#[tokio::test]
async fn finding_precedes_the_step_that_closed_it() -> Result<()> {
    let (events, result) =
        run_session(shared_address_chain(), TraceRequest::new(txid(1), 0)).await;
    result?;

    let finding_pos = events
        .iter()
        .position(|e| matches!(e, TraceEvent::CycleFinding { .. }))
        .expect("finding emitted");
    let closing_step_pos = events
        .iter()
        .position(|e| {
            matches!(e, TraceEvent::Step { outpoint, .. } if outpoint.txid == txid(3))
        })
        .expect("closing step emitted");
    assert!(finding_pos < closing_step_pos);
    Ok(())
}

#[tokio::test]
async fn closing_step_is_enriched_with_cycle_risk() -> Result<()> {
    let (events, result) =
        run_session(shared_address_chain(), TraceRequest::new(txid(1), 0)).await;
    result?;

    let pattern_risk = events
        .iter()
        .find_map(|e| match e {
            TraceEvent::CycleFinding { pattern } => Some(pattern.risk_score),
            _ => None,
        })
        .expect("finding emitted");

    match events
        .iter()
        .find(|e| matches!(e, TraceEvent::Step { outpoint, .. } if outpoint.txid == txid(3)))
        .expect("closing step emitted")
    {
        TraceEvent::Step {
            is_circular,
            circular_risk,
            ..
        } => {
            assert!(*is_circular);
            assert_eq!(*circular_risk, pattern_risk);
        }
        _ => unreachable!(),
    }
    Ok(())
}

#[tokio::test]
async fn timestamped_steps_feed_the_timing_factor_safely() -> Result<()> {
    // Block times are present on every step of the fixture; the timing
    // factor has real intervals to work with and the score must stay
    // within bounds
    let (events, result) =
        run_session(shared_address_chain(), TraceRequest::new(txid(1), 0)).await;
    result?;

    match events
        .iter()
        .find(|e| matches!(e, TraceEvent::AnalysisSummary { .. }))
        .expect("summary emitted")
    {
        TraceEvent::AnalysisSummary { report } => {
            assert_eq!(report.total_cycles, 1);
            assert!((0.0..=1.0).contains(&report.average_risk_score));
            assert!(report.total_circular_value > 0.0);
        }
        _ => unreachable!(),
    }
    Ok(())
}

#[tokio::test]
async fn transient_backend_failure_surfaces_as_connectivity_error() {
    let mut ledger = MockLedger::new();
    ledger.add_tx(
        &txid(1),
        vec![(txid(2), 0)],
        vec![(vec!["1Addr"], 1_000_000)],
    );
    ledger.add_tx(
        &txid(2),
        vec![],
        vec![(vec!["1Addr2"], 1_000_000)],
    );
    ledger.fail_transiently(&txid(2));

    let (events, result) = run_session(ledger, TraceRequest::new(txid(1), 0)).await;

    assert!(matches!(result, Err(AppError::Port(_))));
    match events.last().unwrap() {
        TraceEvent::Error { message } => {
            assert!(
                message.contains("connect"),
                "expected connectivity phrasing, got: {}",
                message
            );
        }
        other => panic!("expected terminal Error, got {:?}", other),
    }
}
