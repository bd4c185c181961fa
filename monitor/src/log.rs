//! Read access to the oracle's event log and assertion accounts

use std::collections::BTreeMap;

use async_trait::async_trait;
use optimistic_governor::oracle::OracleAssertion;

use crate::config::SlotRange;
use crate::error::{MonitorError, Result};
use crate::events::AssertionMade;

/// An event together with the transaction that emitted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent<T> {
    /// Base58 transaction signature
    pub signature: String,
    pub slot: u64,
    pub event: T,
}

/// Source of oracle history. Implementations are read-only.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Every `AssertionMade` emitted by the oracle in `range`, oldest first.
    async fn assertion_made_events(&self, range: SlotRange) -> Result<Vec<LoggedEvent<AssertionMade>>>;

    /// Current detail record of an assertion.
    async fn assertion(&self, assertion_id: &[u8; 32]) -> Result<OracleAssertion>;

    /// Most recent slot the log has data for.
    async fn latest_slot(&self) -> Result<u64>;
}

/// Event log held in memory, for replaying captured history.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    events: Vec<LoggedEvent<AssertionMade>>,
    assertions: BTreeMap<[u8; 32], OracleAssertion>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event; events are kept in slot order.
    pub fn record(&mut self, signature: impl Into<String>, slot: u64, event: AssertionMade) {
        let index = self.events.partition_point(|logged| logged.slot <= slot);
        self.events.insert(
            index,
            LoggedEvent {
                signature: signature.into(),
                slot,
                event,
            },
        );
    }

    /// Insert or replace an assertion's detail record.
    pub fn put_assertion(&mut self, assertion: OracleAssertion) {
        self.assertions.insert(assertion.assertion_id, assertion);
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn assertion_made_events(&self, range: SlotRange) -> Result<Vec<LoggedEvent<AssertionMade>>> {
        Ok(self
            .events
            .iter()
            .filter(|logged| range.contains(logged.slot))
            .cloned()
            .collect())
    }

    async fn assertion(&self, assertion_id: &[u8; 32]) -> Result<OracleAssertion> {
        self.assertions
            .get(assertion_id)
            .cloned()
            .ok_or_else(|| MonitorError::assertion_not_found(assertion_id))
    }

    async fn latest_slot(&self) -> Result<u64> {
        Ok(self.events.last().map_or(0, |logged| logged.slot))
    }
}
