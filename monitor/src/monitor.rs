//! Assertion scanning over slot ranges

use futures::future::try_join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{MonitorParams, SlotRange};
use crate::error::Result;
use crate::log::EventLog;
use crate::sink::{AssertionRecord, AssertionSink};

/// Forward every assertion made in `params.slot_range` to `sink`, in log
/// order. Returns the number of records forwarded.
///
/// Read-only: running it twice over the same range forwards the same
/// records again. Invalid parameters and any log or sink failure abort the
/// scan.
pub async fn monitor_assertions(
    log: &dyn EventLog,
    sink: &dyn AssertionSink,
    params: &MonitorParams,
) -> Result<usize> {
    params.validate()?;
    scan_range(log, sink, params, params.slot_range).await
}

async fn scan_range(
    log: &dyn EventLog,
    sink: &dyn AssertionSink,
    params: &MonitorParams,
    range: SlotRange,
) -> Result<usize> {
    let events = log.assertion_made_events(range).await?;
    debug!(
        start = range.start,
        end = range.end,
        count = events.len(),
        "assertion events in range"
    );

    // Detail lookups run concurrently; records still go out in log order
    let details = try_join_all(
        events
            .iter()
            .map(|logged| log.assertion(&logged.event.assertion_id)),
    )
    .await?;

    let count = events.len();
    for (logged, assertion) in events.into_iter().zip(details) {
        let record = AssertionRecord {
            signature: logged.signature,
            slot: logged.slot,
            assertion_id: logged.event.assertion_id,
            claim: logged.event.claim,
            assertion,
        };
        sink.log_assertion(&record, params).await?;
    }
    Ok(count)
}

/// Scan `params.slot_range.start..` in consecutive ranges up to the log's
/// latest slot, sleeping `params.poll_interval()` between scans, until
/// `shutdown` turns true or `params.slot_range.end` has been scanned.
///
/// Returns the total number of records forwarded.
pub async fn poll_assertions(
    log: &dyn EventLog,
    sink: &dyn AssertionSink,
    params: &MonitorParams,
    mut shutdown: watch::Receiver<bool>,
) -> Result<usize> {
    params.validate()?;
    let mut next = params.slot_range.start;
    let mut total = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let latest = log.latest_slot().await?.min(params.slot_range.end);
        if latest >= next {
            let range = SlotRange::new(next, latest)?;
            let forwarded = scan_range(log, sink, params, range).await?;
            info!(start = range.start, end = range.end, forwarded, "scanned slot range");
            total += forwarded;
            next = latest.saturating_add(1);
        }
        if next > params.slot_range.end {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(params.poll_interval()) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    warn!("shutdown sender dropped, stopping monitor");
                    break;
                }
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::events::AssertionMade;
    use crate::log::MemoryEventLog;
    use anchor_lang::prelude::Pubkey;
    use async_trait::async_trait;
    use optimistic_governor::oracle::OracleAssertion;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<AssertionRecord>>,
        fail: bool,
    }

    impl CollectingSink {
        fn ids(&self) -> Vec<[u8; 32]> {
            self.records
                .lock()
                .map(|records| records.iter().map(|r| r.assertion_id).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl AssertionSink for CollectingSink {
        async fn log_assertion(&self, record: &AssertionRecord, _params: &MonitorParams) -> Result<()> {
            if self.fail {
                return Err(MonitorError::Sink("sink offline".to_string()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn oracle() -> Pubkey {
        Pubkey::new_from_array([8; 32])
    }

    fn event(n: u8) -> AssertionMade {
        AssertionMade {
            assertion_id: [n; 32],
            domain_id: [0; 32],
            claim: format!("proposalHash:{:02x},explanation:pay,rules:r", n).into_bytes(),
            asserter: Pubkey::new_from_array([1; 32]),
            callback_recipient: Pubkey::new_from_array([2; 32]),
            escalation_manager: Pubkey::default(),
            caller: Pubkey::new_from_array([2; 32]),
            expiration_time: 1_700_007_200,
            currency: Pubkey::new_from_array([3; 32]),
            bond: 1_000_000,
            identifier: [4; 32],
        }
    }

    fn detail(n: u8, settled: bool) -> OracleAssertion {
        OracleAssertion {
            assertion_id: [n; 32],
            asserter: Pubkey::new_from_array([1; 32]),
            bond: 1_000_000,
            settled,
            settlement_resolution: settled,
            ..OracleAssertion::default()
        }
    }

    /// Assertions 1, 2, 3 made at slots 10, 12, 15
    fn sample_log() -> MemoryEventLog {
        let mut log = MemoryEventLog::new();
        for (n, slot) in [(3u8, 15u64), (1, 10), (2, 12)] {
            log.record(format!("sig{}", n), slot, event(n));
            log.put_assertion(detail(n, n == 1));
        }
        log
    }

    fn params(start: u64, end: u64) -> MonitorParams {
        MonitorParams::new("http://localhost:8899", oracle(), SlotRange::new(start, end).unwrap())
    }

    #[tokio::test]
    async fn test_forwards_range_in_log_order() {
        let log = sample_log();
        let sink = CollectingSink::default();

        let forwarded = monitor_assertions(&log, &sink, &params(10, 12)).await.unwrap();

        assert_eq!(forwarded, 2);
        assert_eq!(sink.ids(), vec![[1; 32], [2; 32]]);
        let records = sink.records.lock().unwrap();
        assert_eq!(records[0].signature, "sig1");
        assert_eq!(records[0].slot, 10);
        assert_eq!(records[0].claim_text(), "proposalHash:01,explanation:pay,rules:r");
        assert!(records[0].assertion.settled);
        assert!(!records[1].assertion.settled);
        assert!(!records[1].is_disputed());
    }

    #[tokio::test]
    async fn test_rescanning_range_repeats_records() {
        let log = sample_log();
        let sink = CollectingSink::default();
        let params = params(0, 100);

        monitor_assertions(&log, &sink, &params).await.unwrap();
        monitor_assertions(&log, &sink, &params).await.unwrap();

        let ids = sink.ids();
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[..3], ids[3..]);
    }

    #[tokio::test]
    async fn test_empty_range_forwards_nothing() {
        let log = sample_log();
        let sink = CollectingSink::default();
        assert_eq!(monitor_assertions(&log, &sink, &params(16, 20)).await.unwrap(), 0);
        assert!(sink.ids().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_assertion_aborts_before_forwarding() {
        let mut log = sample_log();
        log.record("sig9", 11, event(9));
        let sink = CollectingSink::default();

        let err = monitor_assertions(&log, &sink, &params(10, 12)).await.unwrap_err();
        assert!(matches!(err, MonitorError::AssertionNotFound(id) if id == hex::encode([9u8; 32])));
        assert!(sink.ids().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_before_scanning() {
        let log = sample_log();
        let sink = CollectingSink::default();
        let mut params = params(0, 100);
        params.page_size = 0;

        let err = monitor_assertions(&log, &sink, &params).await.unwrap_err();
        assert!(matches!(err, MonitorError::InvalidParameter(_)));
        assert!(sink.ids().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let log = sample_log();
        let sink = CollectingSink {
            fail: true,
            ..CollectingSink::default()
        };
        let err = monitor_assertions(&log, &sink, &params(0, 100)).await.unwrap_err();
        assert!(matches!(err, MonitorError::Sink(_)));
    }

    #[tokio::test]
    async fn test_poll_stops_after_range_end() {
        let log = sample_log();
        let sink = CollectingSink::default();
        let (_tx, rx) = watch::channel(false);

        let total = poll_assertions(&log, &sink, &params(11, 15), rx).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(sink.ids(), vec![[2; 32], [3; 32]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_on_shutdown() {
        let log = sample_log();
        let sink = CollectingSink::default();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(true);
        });

        // Range extends past the log's latest slot, so only shutdown ends it
        let total = poll_assertions(&log, &sink, &params(0, 1_000), rx).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(sink.ids().len(), 3);
    }
}
